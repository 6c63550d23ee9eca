//! The storage collaborator interface the pipeline depends on.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use folio_common::digest_bytes;
use tracing::{info, warn};

use crate::error::{DbError, Result};
use crate::schema::{BlobAttributes, BlobId, BlobMetadata, IntegrityReport, PutOutcome, StorageStats};

/// Content-addressable blob storage.
///
/// Implementations:
/// - `FsBlobStore`: local directory tree
/// - `MemoryBlobStore`: process memory, for tests and dry runs
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Look up a blob by the digest of its bytes.
    async fn find_by_digest(&self, digest: &str) -> Result<Option<BlobId>>;

    /// Store bytes unless a blob with the same digest already exists.
    async fn put(&self, bytes: &[u8], attrs: BlobAttributes) -> Result<PutOutcome>;

    /// Read a blob's bytes back.
    async fn get(&self, id: &BlobId) -> Result<Vec<u8>>;

    /// Metadata recorded when the blob was stored.
    async fn metadata(&self, id: &BlobId) -> Result<BlobMetadata>;

    /// Metadata of every stored blob.
    async fn list(&self) -> Result<Vec<BlobMetadata>>;

    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Re-hash a stored blob and compare against the digest recorded at
    /// storage time. A disagreement is returned as `DbError::IntegrityMismatch`.
    ///
    /// When `original` is given, its size and digest are reported next to the
    /// stored ones.
    async fn verify(&self, id: &BlobId, original: Option<&Path>) -> Result<IntegrityReport> {
        let meta = self.metadata(id).await?;
        let bytes = self.get(id).await?;
        let current_hash = digest_bytes(&bytes);

        if current_hash != meta.file_hash {
            warn!(
                store = self.name(),
                blob = %id,
                recorded = %meta.file_hash,
                computed = %current_hash,
                "Stored blob failed integrity check"
            );
            return Err(DbError::IntegrityMismatch {
                id: id.to_string(),
                recorded: meta.file_hash,
                computed: current_hash,
            });
        }

        let (original_size, original_hash) = match original {
            Some(path) if path.exists() => {
                let data = tokio::fs::read(path).await?;
                (Some(data.len() as u64), Some(digest_bytes(&data)))
            }
            _ => (None, None),
        };

        let report = IntegrityReport {
            id: id.clone(),
            filename: meta.original_filename,
            stored_size: bytes.len() as u64,
            size_match: original_size.map(|s| s == bytes.len() as u64),
            original_hash_match: original_hash.as_ref().map(|h| *h == current_hash),
            stored_hash: meta.file_hash,
            current_hash,
            original_size,
            original_hash,
            verification_timestamp: Utc::now(),
        };
        info!(store = self.name(), blob = %id, "Blob integrity verified");
        Ok(report)
    }

    /// Totals over all stored blobs, grouped by university and year.
    async fn stats(&self) -> Result<StorageStats> {
        let records = self.list().await?;
        Ok(StorageStats::from_metadata(&records))
    }
}

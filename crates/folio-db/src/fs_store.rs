//! Filesystem-backed blob store.
//!
//! Layout: `<root>/<first two hex chars>/<digest>` holds the bytes and
//! `<digest>.json` next to it holds the `BlobMetadata`. Writes go through a
//! temporary file and a rename so a crashed write never leaves a truncated
//! blob under a valid digest. Puts are serialized within one store, so
//! concurrent puts of the same bytes write once.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use folio_common::{digest_bytes, is_digest};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::blob_store::BlobStore;
use crate::error::{DbError, Result};
use crate::schema::{BlobAttributes, BlobId, BlobMetadata, PutOutcome};

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

impl FsBlobStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "Blob store opened");
        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn shard_dir(&self, digest: &str) -> PathBuf {
        self.root.join(&digest[..2])
    }

    fn blob_path(&self, digest: &str) -> PathBuf {
        self.shard_dir(digest).join(digest)
    }

    fn meta_path(&self, digest: &str) -> PathBuf {
        self.shard_dir(digest).join(format!("{digest}.json"))
    }

    /// Ids double as file names, so anything that is not a digest is refused
    /// before it gets near a path.
    fn checked<'a>(&self, id: &'a str) -> Result<&'a str> {
        if is_digest(id) {
            Ok(id)
        } else {
            Err(DbError::InvalidId(id.to_string()))
        }
    }

    /// Each call writes through its own hidden temp file in the target's
    /// directory, then renames it into place.
    async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("blob");
        let tmp = path.with_file_name(format!(
            ".{name}.{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(e) = fs::write(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn find_by_digest(&self, digest: &str) -> Result<Option<BlobId>> {
        let digest = self.checked(digest)?;
        if fs::try_exists(self.meta_path(digest)).await? {
            Ok(Some(BlobId::new(digest)))
        } else {
            Ok(None)
        }
    }

    async fn put(&self, bytes: &[u8], attrs: BlobAttributes) -> Result<PutOutcome> {
        let digest = digest_bytes(bytes);
        let _guard = self.write_lock.lock().await;

        if let Some(existing) = self.find_by_digest(&digest).await? {
            debug!(blob = %existing, file = %attrs.original_filename, "Blob already stored, skipping write");
            return Ok(PutOutcome { id: existing, was_new: false });
        }

        fs::create_dir_all(self.shard_dir(&digest)).await?;
        let meta = BlobMetadata::new(digest.clone(), bytes.len() as u64, attrs);

        // Bytes first, metadata last: the metadata file marks the blob as present.
        Self::write_atomic(&self.blob_path(&digest), bytes).await?;
        Self::write_atomic(&self.meta_path(&digest), &serde_json::to_vec_pretty(&meta)?).await?;

        info!(
            blob = %meta.id,
            file = %meta.original_filename,
            size = meta.file_size,
            "Blob stored"
        );
        Ok(PutOutcome { id: meta.id, was_new: true })
    }

    async fn get(&self, id: &BlobId) -> Result<Vec<u8>> {
        let digest = self.checked(id.as_str())?;
        match fs::read(self.blob_path(digest)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DbError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn metadata(&self, id: &BlobId) -> Result<BlobMetadata> {
        let digest = self.checked(id.as_str())?;
        let raw = match fs::read(self.meta_path(digest)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DbError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn list(&self) -> Result<Vec<BlobMetadata>> {
        let mut records = Vec::new();
        let mut shards = fs::read_dir(&self.root).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let raw = fs::read(&path).await?;
                records.push(serde_json::from_slice::<BlobMetadata>(&raw)?);
            }
        }
        records.sort_by(|a, b| a.upload_timestamp.cmp(&b.upload_timestamp));
        Ok(records)
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}

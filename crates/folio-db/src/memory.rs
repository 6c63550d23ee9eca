//! In-process blob store, for tests and embedding callers that need no persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use folio_common::digest_bytes;
use tokio::sync::RwLock;

use crate::blob_store::BlobStore;
use crate::error::{DbError, Result};
use crate::schema::{BlobAttributes, BlobId, BlobMetadata, PutOutcome};

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, (Vec<u8>, BlobMetadata)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn find_by_digest(&self, digest: &str) -> Result<Option<BlobId>> {
        let id = BlobId::new(digest);
        Ok(self.blobs.read().await.contains_key(&id).then_some(id))
    }

    async fn put(&self, bytes: &[u8], attrs: BlobAttributes) -> Result<PutOutcome> {
        let digest = digest_bytes(bytes);
        let mut blobs = self.blobs.write().await;
        let id = BlobId::new(digest.clone());
        if blobs.contains_key(&id) {
            return Ok(PutOutcome { id, was_new: false });
        }
        let meta = BlobMetadata::new(digest, bytes.len() as u64, attrs);
        blobs.insert(id.clone(), (bytes.to_vec(), meta));
        Ok(PutOutcome { id, was_new: true })
    }

    async fn get(&self, id: &BlobId) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(id)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| DbError::NotFound(id.to_string()))
    }

    async fn metadata(&self, id: &BlobId) -> Result<BlobMetadata> {
        self.blobs
            .read()
            .await
            .get(id)
            .map(|(_, meta)| meta.clone())
            .ok_or_else(|| DbError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<BlobMetadata>> {
        let mut records: Vec<_> = self
            .blobs
            .read()
            .await
            .values()
            .map(|(_, meta)| meta.clone())
            .collect();
        records.sort_by(|a, b| a.upload_timestamp.cmp(&b.upload_timestamp));
        Ok(records)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

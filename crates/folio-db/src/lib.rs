//! Folio Storage Layer
//!
//! Content-addressable storage for the raw PDF bytes the ingestion pipeline
//! reads. Blobs are keyed by their SHA-256 digest, so storing the same bytes
//! twice (even under two different file names) yields one blob.
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_db::{BlobAttributes, BlobStore, FsBlobStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FsBlobStore::open("./data/blobs").await?;
//!     let bytes = std::fs::read("paper.pdf")?;
//!     let stored = store.put(&bytes, BlobAttributes::for_file("paper.pdf")).await?;
//!     let report = store.verify(&stored.id, None).await?;
//!     assert_eq!(report.stored_hash, report.current_hash);
//!     Ok(())
//! }
//! ```

pub mod blob_store;
pub mod error;
pub mod fs_store;
pub mod memory;
pub mod schema;

pub use blob_store::BlobStore;
pub use error::{DbError, Result};
pub use fs_store::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use schema::{
    BlobAttributes, BlobId, BlobMetadata, IntegrityReport, PutOutcome, StorageStats,
    PDF_CONTENT_TYPE,
};

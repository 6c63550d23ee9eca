//! folio-common — Shared primitives used across all Folio crates.

pub mod digest;

// Re-export commonly used items
pub use digest::{digest_bytes, digest_file, digest_reader, is_digest, BLOCK_SIZE, DIGEST_HEX_LEN};

//! Content digests for deduplicating stored documents.
//!
//! A digest is the lowercase hex SHA-256 of the exact input bytes. It is the
//! identity the blob store dedups on, so it must never depend on anything but
//! the bytes themselves (not the file name, not the path, not the mtime).

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Read block size used when hashing streams.
pub const BLOCK_SIZE: usize = 4096;

/// Length of a hex-encoded digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Digest an in-memory byte slice.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for block in bytes.chunks(BLOCK_SIZE) {
        hasher.update(block);
    }
    hex::encode(hasher.finalize())
}

/// Digest everything a reader yields, one block at a time.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BLOCK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Digest a file on disk without loading it whole.
pub fn digest_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let digest = digest_reader(io::BufReader::new(file))?;
    tracing::trace!(path = %path.display(), digest = %digest, "File digested");
    Ok(digest)
}

/// Cheap shape check for strings claiming to be a digest.
pub fn is_digest(candidate: &str) -> bool {
    candidate.len() == DIGEST_HEX_LEN
        && candidate.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

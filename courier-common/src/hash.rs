//! SHA-256 content fingerprinting
//!
//! Computes the fingerprint of a finished artifact using buffered I/O with
//! hardware acceleration. The async entry point runs the CPU-bound work on
//! tokio's blocking pool so request workers are never stalled by large blobs.
//!
//! Fingerprints are lowercase hex strings and are a pure function of the bytes:
//! identical content always yields the identical fingerprint.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::HASH_BUFFER_SIZE;

/// Compute the SHA-256 fingerprint of an entire file
///
/// Runs on a blocking thread pool to avoid blocking async workers.
pub async fn compute_sha256(path: &Path) -> io::Result<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || compute_sha256_sync(&path))
        .await
        .map_err(|e| io::Error::other(format!("hash task failed: {e}")))?
}

/// Synchronous SHA-256 computation over a file
pub fn compute_sha256_sync(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    compute_sha256_reader(file)
}

/// SHA-256 over everything a reader yields
pub fn compute_sha256_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of an in-memory byte slice
#[must_use]
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

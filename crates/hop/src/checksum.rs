use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 256 * 1024;

/// Stream a file through SHA-256 and return the digest as uppercase hex.
///
/// This matches the format the storage endpoint reports in listings, so the
/// two can be compared directly.
pub fn file_checksum(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode_upper(hasher.finalize()))
}

/// Uppercase hex SHA-256 of an in-memory buffer.
pub fn bytes_checksum(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

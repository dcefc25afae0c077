//! Exact content hashes, streamed so large files never sit in memory.

use super::to_hex;
use crate::error::HashError;
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

const BUFFER_SIZE: usize = 64 * 1024;

fn stream_file<F>(path: &Path, mut update: F) -> Result<(), HashError>
where
    F: FnMut(&[u8]),
{
    let io_error = |source| HashError::IoError {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_error)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer).map_err(io_error)?;
        if read == 0 {
            return Ok(());
        }
        update(&buffer[..read]);
    }
}

/// SHA-512 of the file contents (128 hex characters)
pub fn sha512_file(path: &Path) -> Result<String, HashError> {
    let mut hasher = Sha512::new();
    stream_file(path, |chunk| hasher.update(chunk))?;
    Ok(to_hex(&hasher.finalize()))
}

/// 128-bit xxh3 of the file contents (32 hex characters)
pub fn xxh3_file(path: &Path) -> Result<String, HashError> {
    let mut hasher = Xxh3::new();
    stream_file(path, |chunk| hasher.update(chunk))?;
    Ok(format!("{:032x}", hasher.digest128()))
}

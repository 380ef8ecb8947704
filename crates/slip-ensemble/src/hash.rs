use std::fs;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use slip_core::errors::{EnsembleError, ErrorInfo};

use crate::serde::to_canonical_json_bytes;

/// Computes a stable SHA256 hash for the provided serializable value.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, EnsembleError> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(bytes_sha256(&bytes))
}

/// Hex encoded SHA256 of a byte slice.
pub fn bytes_sha256(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hex encoded SHA256 of a file's contents.
pub fn file_sha256(path: &Path) -> Result<String, EnsembleError> {
    let bytes = fs::read(path).map_err(|err| {
        EnsembleError::Io(
            ErrorInfo::new("hash-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    Ok(bytes_sha256(&bytes))
}

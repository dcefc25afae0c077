//! # Hasher Module
//!
//! Computes the hash stored with every cataloged asset.
//!
//! ## Supported Algorithms
//! - **SHA-512** - Cryptographic content hash, the default
//! - **xxh3** - Much faster content hash for large libraries
//! - **dHash (Difference Hash)** - 64-bit perceptual hash, lets the duplicate
//!   finder match resized or re-encoded copies
//!
//! Every algorithm produces a lowercase hexadecimal string.
//!
//! ## Example
//! ```rust,ignore
//! use photo_catalog::core::hasher::{AssetHasher, HashAlgorithmKind};
//!
//! let hasher = AssetHasher::new(HashAlgorithmKind::Xxh3);
//! let hash = hasher.hash_file(&path)?;
//! ```

mod content;
mod difference;

pub use content::{sha512_file, xxh3_file};
pub use difference::DifferenceHasher;

use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Available hash algorithms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithmKind {
    #[default]
    Sha512,
    Xxh3,
    /// Difference Hash (dHash) - compares brightness gradients between pixels
    Difference,
}

impl HashAlgorithmKind {
    /// Get a human-readable description of the algorithm
    pub fn description(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Sha512 => "SHA-512 - Exact content hash",
            HashAlgorithmKind::Xxh3 => "xxh3 - Fast exact content hash",
            HashAlgorithmKind::Difference => {
                "Difference Hash (dHash) - Compares brightness gradients between pixels"
            }
        }
    }

    /// Whether hashes of this kind can be compared by Hamming distance
    pub fn is_perceptual(&self) -> bool {
        matches!(self, HashAlgorithmKind::Difference)
    }
}

impl std::fmt::Display for HashAlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithmKind::Sha512 => write!(f, "SHA-512"),
            HashAlgorithmKind::Xxh3 => write!(f, "xxh3"),
            HashAlgorithmKind::Difference => write!(f, "dHash"),
        }
    }
}

/// Hashes asset files with the configured algorithm
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetHasher {
    algorithm: HashAlgorithmKind,
}

impl AssetHasher {
    pub fn new(algorithm: HashAlgorithmKind) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithmKind {
        self.algorithm
    }

    /// Hash the file at `path` as lowercase hex
    pub fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        match self.algorithm {
            HashAlgorithmKind::Sha512 => sha512_file(path),
            HashAlgorithmKind::Xxh3 => xxh3_file(path),
            HashAlgorithmKind::Difference => DifferenceHasher::new().hash_file(path),
        }
    }
}

/// Number of differing bits between two hex-encoded hashes.
///
/// Returns `None` when the strings differ in length or are not hex.
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    if a.len() != b.len() {
        return None;
    }

    a.chars().zip(b.chars()).try_fold(0u32, |distance, (x, y)| {
        let x = x.to_digit(16)?;
        let y = y.to_digit(16)?;
        Some(distance + (x ^ y).count_ones())
    })
}

/// Lowercase hex encoding shared by the content hashers
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_algorithm_is_sha512() {
        assert_eq!(HashAlgorithmKind::default(), HashAlgorithmKind::Sha512);
        assert_eq!(AssetHasher::default().algorithm(), HashAlgorithmKind::Sha512);
    }

    #[test]
    fn only_dhash_is_perceptual() {
        assert!(HashAlgorithmKind::Difference.is_perceptual());
        assert!(!HashAlgorithmKind::Sha512.is_perceptual());
        assert!(!HashAlgorithmKind::Xxh3.is_perceptual());
    }

    #[test]
    fn algorithm_kind_display() {
        assert_eq!(HashAlgorithmKind::Sha512.to_string(), "SHA-512");
        assert_eq!(HashAlgorithmKind::Xxh3.to_string(), "xxh3");
        assert_eq!(HashAlgorithmKind::Difference.to_string(), "dHash");
    }

    #[test]
    fn kind_serializes_by_name() {
        let json = serde_json::to_string(&HashAlgorithmKind::Xxh3).unwrap();
        assert_eq!(json, "\"Xxh3\"");
    }

    #[test]
    fn hasher_dispatches_on_algorithm() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, b"same bytes").unwrap();

        let sha = AssetHasher::new(HashAlgorithmKind::Sha512).hash_file(&path).unwrap();
        let xxh = AssetHasher::new(HashAlgorithmKind::Xxh3).hash_file(&path).unwrap();

        assert_eq!(sha.len(), 128);
        assert_eq!(xxh.len(), 32);
    }

    #[test]
    fn hamming_distance_counts_differing_bits() {
        assert_eq!(hamming_distance("ff00", "ff00"), Some(0));
        assert_eq!(hamming_distance("ff", "00"), Some(8));
        assert_eq!(hamming_distance("0f", "0e"), Some(1));
    }

    #[test]
    fn hamming_distance_rejects_mismatched_input() {
        assert_eq!(hamming_distance("ff", "fff"), None);
        assert_eq!(hamming_distance("zz", "00"), None);
    }

    #[test]
    fn to_hex_produces_correct_string() {
        assert_eq!(to_hex(&[0xDE, 0xAD, 0xBE, 0xEF]), "deadbeef");
    }
}

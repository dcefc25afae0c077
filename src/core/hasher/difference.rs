//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Resizing the image to a tiny grayscale grid
//! 2. Comparing each pixel to its neighbour
//! 3. Setting a bit when the brightness decreases
//!
//! The gradient is delegated to the image_hasher crate.

use super::to_hex;
use crate::error::HashError;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use std::path::Path;

const HASH_SIZE: u32 = 8;

/// 64-bit Difference Hash
pub struct DifferenceHasher {
    hasher: image_hasher::Hasher,
}

impl DifferenceHasher {
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(HASH_SIZE, HASH_SIZE)
            .hash_alg(HashAlg::Gradient)
            .to_hasher();

        Self { hasher }
    }

    pub fn hash_image(&self, image: &DynamicImage) -> String {
        to_hex(self.hasher.hash_image(image).as_bytes())
    }

    pub fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        let image = image::open(path).map_err(|e| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(self.hash_image(&image))
    }
}

impl Default for DifferenceHasher {
    fn default() -> Self {
        Self::new()
    }
}

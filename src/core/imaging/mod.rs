//! # Imaging Module
//!
//! Decodes assets and renders their catalog thumbnails.
//!
//! Decoding honours the EXIF orientation tag so thumbnails are always shown
//! upright. Thumbnails are resized with `fast_image_resize` and stored as
//! JPEG bytes.

mod thumbnail;

pub use thumbnail::{Thumbnail, ThumbnailGenerator};

use crate::core::model::{Dimensions, Rotation};
use crate::error::ImagingError;
use exif::{In, Reader, Tag, Value};
use image::DynamicImage;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Rotation requested by the EXIF orientation tag.
///
/// Files without EXIF data (or that cannot be read) are not rotated.
pub fn read_rotation(path: &Path) -> Rotation {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Rotation::Rotate0,
    };

    let mut bufreader = BufReader::new(&file);
    let exif_reader = match Reader::new().read_from_container(&mut bufreader) {
        Ok(r) => r,
        Err(_) => return Rotation::Rotate0,
    };

    exif_reader
        .get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| match &field.value {
            Value::Short(vec) => vec.first().map(|v| *v as u32),
            Value::Long(vec) => vec.first().copied(),
            _ => None,
        })
        .map(Rotation::from_exif_orientation)
        .unwrap_or_default()
}

/// Turn a decoded image so it displays upright
pub fn apply_rotation(image: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::Rotate0 => image,
        Rotation::Rotate90 => image.rotate90(),
        Rotation::Rotate180 => image.rotate180(),
        Rotation::Rotate270 => image.rotate270(),
    }
}

/// A decoded asset together with what was learned while decoding it
pub struct DecodedAsset {
    pub image: DynamicImage,
    pub rotation: Rotation,
    /// Size of the stored pixels, before rotation
    pub original: Dimensions,
}

/// Decode the file at `path` and apply its EXIF rotation
pub fn decode(path: &Path) -> Result<DecodedAsset, ImagingError> {
    let image = image::open(path).map_err(|e| ImagingError::DecodeFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if image.width() == 0 || image.height() == 0 {
        return Err(ImagingError::EmptyImage {
            path: path.to_path_buf(),
        });
    }

    let original = Dimensions::new(image.width(), image.height());
    let rotation = read_rotation(path);

    Ok(DecodedAsset {
        image: apply_rotation(image, rotation),
        rotation,
        original,
    })
}

/// Whether `bytes` decode to a non-empty image
pub fn is_valid_image(bytes: &[u8]) -> bool {
    image::load_from_memory(bytes)
        .map(|image| image.width() > 0 && image.height() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::write_test_image;
    use tempfile::TempDir;

    #[test]
    fn image_without_exif_is_not_rotated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.png");
        write_test_image(&path, 40, 20, 1);

        assert_eq!(read_rotation(&path), Rotation::Rotate0);
    }

    #[test]
    fn missing_file_is_not_rotated() {
        assert_eq!(read_rotation(Path::new("/nonexistent.jpg")), Rotation::Rotate0);
    }

    #[test]
    fn decode_reports_original_dimensions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wide.png");
        write_test_image(&path, 40, 20, 1);

        let decoded = decode(&path).unwrap();

        assert_eq!(decoded.original, Dimensions::new(40, 20));
        assert_eq!(decoded.image.width(), 40);
        assert_eq!(decoded.rotation, Rotation::Rotate0);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let image = DynamicImage::new_rgb8(40, 20);
        let rotated = apply_rotation(image, Rotation::Rotate90);
        assert_eq!((rotated.width(), rotated.height()), (20, 40));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(matches!(decode(&path), Err(ImagingError::DecodeFailed { .. })));
    }

    #[test]
    fn validity_check() {
        assert!(!is_valid_image(b""));
        assert!(!is_valid_image(b"not an image"));
    }
}

//! Shared fixtures for unit tests.

use crate::core::model::{Asset, AssetMetadata, FileProperties, Folder, Pixel, Rotation};
use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb, RgbImage};
use std::path::Path;
use std::time::{Duration, SystemTime};

/// A cataloged asset with plausible values
pub fn sample_asset(folder: &Folder, file_name: &str) -> Asset {
    let now = Utc::now();
    Asset {
        folder_id: folder.id,
        folder: folder.clone(),
        file_name: file_name.to_string(),
        pixel: Pixel::default(),
        file_properties: FileProperties {
            size: 1024,
            creation: now,
            modification: now,
        },
        thumbnail_creation: now,
        hash: format!("hash-{}", file_name),
        rotation: Rotation::Rotate0,
        metadata: AssetMetadata::default(),
    }
}

/// Write a small gradient image; `seed` changes the pixel content
pub fn write_test_image(path: &Path, width: u32, height: u32, seed: u8) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let image: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8 ^ seed,
            (y * 255 / height.max(1)) as u8,
            seed,
        ])
    });
    image.save(path).unwrap();
}

/// Write a JPEG whose EXIF block carries `orientation` (1-8)
pub fn write_test_jpeg_with_orientation(path: &Path, width: u32, height: u32, orientation: u8) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let image: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 90)
        .encode_image(&image)
        .unwrap();

    // Little-endian TIFF header with a single Orientation (0x0112) SHORT entry
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00]);
    payload.extend_from_slice(&[0x01, 0x00]);
    payload.extend_from_slice(&[0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00]);
    payload.extend_from_slice(&[orientation, 0x00, 0x00, 0x00]);
    payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let length = (payload.len() + 2) as u16;
    let mut bytes = jpeg[..2].to_vec();
    bytes.extend_from_slice(&[0xFF, 0xE1]);
    bytes.extend_from_slice(&length.to_be_bytes());
    bytes.extend_from_slice(&payload);
    bytes.extend_from_slice(&jpeg[2..]);
    std::fs::write(path, bytes).unwrap();
}

/// Push the modification time of `path` well past anything cataloged so far
pub fn touch_in_future(path: &Path) {
    let later = SystemTime::now() + Duration::from_secs(120);
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(later)
        .unwrap();
}

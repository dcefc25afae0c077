//! Thumbnail rendering with SIMD-accelerated resizing.

use crate::core::model::Dimensions;
use crate::error::ImagingError;
use fast_image_resize::{images::Image, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType};

/// Encoded JPEG thumbnail
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub dimensions: Dimensions,
}

/// Renders thumbnails that fit inside a bounding box
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailGenerator {
    max_width: u32,
    max_height: u32,
    quality: u8,
}

impl ThumbnailGenerator {
    pub fn new(max_width: u32, max_height: u32, quality: u8) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    /// Size that fits `width` x `height` inside the box.
    ///
    /// The aspect ratio is preserved, images are never enlarged and both
    /// sides are at least one pixel.
    pub fn compute_dimensions(&self, width: u32, height: u32) -> Dimensions {
        if width == 0 || height == 0 {
            return Dimensions::new(1, 1);
        }
        if width <= self.max_width && height <= self.max_height {
            return Dimensions::new(width, height);
        }

        let scale = f64::min(
            self.max_width as f64 / width as f64,
            self.max_height as f64 / height as f64,
        );

        Dimensions::new(
            ((width as f64 * scale).round() as u32).clamp(1, self.max_width),
            ((height as f64 * scale).round() as u32).clamp(1, self.max_height),
        )
    }

    pub fn generate(&self, image: &DynamicImage) -> Result<Thumbnail, ImagingError> {
        let rgb = image.to_rgb8();
        let (src_width, src_height) = rgb.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(ImagingError::ThumbnailFailed(
                "Invalid source dimensions".to_string(),
            ));
        }

        let dimensions = self.compute_dimensions(src_width, src_height);

        let pixels = if dimensions.width == src_width && dimensions.height == src_height {
            rgb.into_raw()
        } else {
            let src_image =
                Image::from_vec_u8(src_width, src_height, rgb.into_raw(), PixelType::U8x3)
                    .map_err(|e| {
                        ImagingError::ThumbnailFailed(format!(
                            "Failed to create source image: {}",
                            e
                        ))
                    })?;
            let mut dst_image = Image::new(dimensions.width, dimensions.height, PixelType::U8x3);

            let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
                fast_image_resize::FilterType::Bilinear,
            ));

            Resizer::new()
                .resize(&src_image, &mut dst_image, &options)
                .map_err(|e| ImagingError::ThumbnailFailed(format!("Resize failed: {}", e)))?;

            dst_image.into_vec()
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode(
                &pixels,
                dimensions.width,
                dimensions.height,
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| ImagingError::ThumbnailFailed(format!("JPEG encoding failed: {}", e)))?;

        Ok(Thumbnail { bytes, dimensions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::imaging::is_valid_image;
    use image::{ImageBuffer, Rgb};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            Rgb([r, g, 128])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn landscape_fits_width() {
        let generator = ThumbnailGenerator::new(200, 150, 80);
        assert_eq!(generator.compute_dimensions(1000, 500), Dimensions::new(200, 100));
    }

    #[test]
    fn portrait_fits_height() {
        let generator = ThumbnailGenerator::new(200, 150, 80);
        assert_eq!(generator.compute_dimensions(300, 600), Dimensions::new(75, 150));
    }

    #[test]
    fn small_images_are_not_enlarged() {
        let generator = ThumbnailGenerator::new(200, 150, 80);
        assert_eq!(generator.compute_dimensions(50, 40), Dimensions::new(50, 40));
    }

    #[test]
    fn extreme_aspect_ratio_keeps_one_pixel() {
        let generator = ThumbnailGenerator::new(200, 150, 80);
        assert_eq!(generator.compute_dimensions(10_000, 1), Dimensions::new(200, 1));
    }

    #[test]
    fn generate_produces_valid_jpeg() {
        let generator = ThumbnailGenerator::new(64, 64, 80);
        let thumbnail = generator.generate(&create_test_image(256, 128)).unwrap();

        assert_eq!(thumbnail.dimensions, Dimensions::new(64, 32));
        assert_eq!(&thumbnail.bytes[..2], &[0xFF, 0xD8]);
        assert!(is_valid_image(&thumbnail.bytes));

        let decoded = image::load_from_memory(&thumbnail.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
    }

    #[test]
    fn generate_keeps_small_image_size() {
        let generator = ThumbnailGenerator::new(200, 150, 80);
        let thumbnail = generator.generate(&create_test_image(30, 20)).unwrap();
        assert_eq!(thumbnail.dimensions, Dimensions::new(30, 20));
    }
}

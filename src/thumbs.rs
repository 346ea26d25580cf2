//! Pholife Vault - Thumbnail Engine
//!
//! Generates the plaintext JPEG preview stored alongside a private photo's
//! ciphertext. Max dimension 300, quality 70, aspect ratio preserved.

use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView};

use crate::error::VaultResult;

/// Default thumbnail bound (longest edge)
pub const THUMB_MAX_DIMENSION: u32 = 300;

/// Default JPEG quality
pub const THUMB_JPEG_QUALITY: u8 = 70;

/// Thumbnail generator
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailEngine {
    max_dimension: u32,
    quality: u8,
}

impl Default for ThumbnailEngine {
    fn default() -> Self {
        Self {
            max_dimension: THUMB_MAX_DIMENSION,
            quality: THUMB_JPEG_QUALITY,
        }
    }
}

impl ThumbnailEngine {
    pub fn new(max_dimension: u32, quality: u8) -> Self {
        Self {
            max_dimension,
            quality,
        }
    }

    /// Generate a JPEG thumbnail from image bytes
    pub fn generate(&self, image_data: &[u8]) -> VaultResult<Vec<u8>> {
        let img = image::load_from_memory(image_data)?;
        let resized = self.resize(&img);

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

        let mut output = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut output), self.quality);
        rgb.write_with_encoder(encoder)?;

        Ok(output)
    }

    /// Shrink to the max dimension, keeping aspect ratio. Images already
    /// within bounds pass through unscaled.
    fn resize(&self, img: &DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        if width <= self.max_dimension && height <= self.max_dimension {
            return img.clone();
        }
        img.resize(self.max_dimension, self.max_dimension, FilterType::Lanczos3)
    }
}

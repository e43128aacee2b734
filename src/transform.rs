//! Transform primitive: image bytes in, JPEG thumbnail bytes out
//!
//! Stateless and deterministic. Flattening policy: images with an alpha
//! channel (or any non-RGB color model) are converted to opaque 8-bit RGB by
//! dropping the alpha channel; transparent pixels keep their stored color
//! values. Scaling never exceeds the configured bounds and never upscales.

use crate::config::PipelineConfig;
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),

    #[error("failed to encode thumbnail: {0}")]
    Encode(image::ImageError),

    #[error("encoder produced an empty thumbnail")]
    EmptyOutput,

    #[error("transform task failed: {0}")]
    Internal(String),
}

/// Result of one resize: the encoded bytes plus dimension metrics
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub data: Bytes,
    pub original_dimensions: (u32, u32),
    pub final_dimensions: (u32, u32),
}

/// Thumbnail generator with fixed bounds and JPEG quality
#[derive(Debug, Clone)]
pub struct Thumbnailer {
    max_width: u32,
    max_height: u32,
    quality: u8,
}

impl Thumbnailer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_width: config.max_width,
            max_height: config.max_height,
            quality: config.jpeg_quality,
        }
    }

    /// Decode, scale to fit the bounds preserving aspect ratio, re-encode
    /// as JPEG.
    ///
    /// CPU-bound; callers on an async runtime should run this through
    /// `spawn_blocking`.
    pub fn resize(&self, data: &[u8]) -> Result<Thumbnail, TransformError> {
        let decoded = image::load_from_memory(data).map_err(TransformError::Decode)?;
        let (orig_w, orig_h) = decoded.dimensions();

        // Flatten transparency / palette color models to plain RGB
        let flattened = DynamicImage::ImageRgb8(decoded.to_rgb8());

        let (final_w, final_h) = self.target_dimensions(orig_w, orig_h);
        let scaled = if (final_w, final_h) == (orig_w, orig_h) {
            flattened
        } else {
            flattened.resize_exact(final_w, final_h, FilterType::Lanczos3)
        };

        let mut buf = Vec::new();
        scaled
            .write_to(
                &mut Cursor::new(&mut buf),
                ImageOutputFormat::Jpeg(self.quality),
            )
            .map_err(TransformError::Encode)?;

        if buf.is_empty() {
            return Err(TransformError::EmptyOutput);
        }

        Ok(Thumbnail {
            data: Bytes::from(buf),
            original_dimensions: (orig_w, orig_h),
            final_dimensions: (final_w, final_h),
        })
    }

    /// Scale factor is `min(1, max_w/w, max_h/h)`: fit inside the bounds,
    /// never upscale.
    fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = (self.max_width as f64 / width as f64)
            .min(self.max_height as f64 / height as f64)
            .min(1.0);

        if scale >= 1.0 {
            return (width, height);
        }

        (
            ((width as f64 * scale).round() as u32).clamp(1, self.max_width),
            ((height as f64 * scale).round() as u32).clamp(1, self.max_height),
        )
    }
}

//! Upload preparation: downscale and recompress photos before they are cached
//! or sent.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::types::ImageFile;

pub trait ImageCompressor: Send + Sync {
    fn compress(&self, file: &ImageFile) -> Result<ImageFile, ClientError>;
}

/// Resizes to a bounded major dimension and re-encodes as JPEG, lowering the
/// quality until the output fits `max_bytes` or `min_quality` is reached.
#[derive(Debug, Clone, Copy)]
pub struct JpegCompressor {
    pub max_dimension: u32,
    pub max_bytes: usize,
    pub initial_quality: u8,
    pub min_quality: u8,
    pub quality_step: u8,
}

impl Default for JpegCompressor {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            max_bytes: 1024 * 1024,
            initial_quality: 85,
            min_quality: 40,
            quality_step: 15,
        }
    }
}

impl JpegCompressor {
    fn encode(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ClientError> {
        let mut buf = Cursor::new(Vec::new());
        image.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
        Ok(buf.into_inner())
    }
}

impl ImageCompressor for JpegCompressor {
    fn compress(&self, file: &ImageFile) -> Result<ImageFile, ClientError> {
        let decoded = image::load_from_memory(&file.bytes)?;
        let (width, height) = decoded.dimensions();
        let resized = if width.max(height) > self.max_dimension {
            decoded.resize(self.max_dimension, self.max_dimension, FilterType::Lanczos3)
        } else {
            decoded
        };
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

        let mut quality = self.initial_quality.max(self.min_quality);
        let mut encoded = Self::encode(&rgb, quality)?;
        while encoded.len() > self.max_bytes && quality > self.min_quality {
            quality = quality
                .saturating_sub(self.quality_step.max(1))
                .max(self.min_quality);
            encoded = Self::encode(&rgb, quality)?;
        }
        debug!(
            filename = %file.name,
            original = file.size(),
            compressed = encoded.len(),
            quality,
            "Compressed image"
        );

        Ok(ImageFile {
            name: file.name.clone(),
            mime_type: "image/jpeg".to_string(),
            bytes: encoded,
            compressed: true,
        })
    }
}

/// Compress a picked file, falling back to the original when compression fails
pub fn prepare_upload(compressor: &dyn ImageCompressor, file: &ImageFile) -> ImageFile {
    match compressor.compress(file) {
        Ok(compressed) => compressed,
        Err(e) => {
            warn!(filename = %file.name, error = %e, "Compression failed, using original");
            ImageFile {
                compressed: false,
                ..file.clone()
            }
        }
    }
}

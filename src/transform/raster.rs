//! Image optimizer.
//!
//! PNG is decoded and re-encoded losslessly at maximum compression; the
//! result is kept only when it is smaller. Every other format (JPEG, GIF,
//! WebP, SVG, ...) is already compressed or not a raster, and is passed
//! through byte for byte. JPEGs are not re-encoded as progressive: that
//! would be a lossy decode and encode, so they are copied as-is.

use std::path::Path;

use image::ImageEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};

use super::{Output, Transform, TransformError};

pub struct ImageOptimizer;

impl Transform for ImageOptimizer {
    fn transform(&self, source: &[u8], path: &Path) -> Result<Output, TransformError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("png") => optimize_png(source).map(Output::new),
            _ => Ok(Output::new(source)),
        }
    }
}

fn optimize_png(source: &[u8]) -> Result<Vec<u8>, TransformError> {
    let decoded = image::load_from_memory_with_format(source, image::ImageFormat::Png)
        .map_err(|e| TransformError::new(format!("invalid png: {e}")))?;

    let mut encoded = Vec::new();
    PngEncoder::new_with_quality(&mut encoded, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            decoded.as_bytes(),
            decoded.width(),
            decoded.height(),
            decoded.color().into(),
        )
        .map_err(|e| TransformError::new(format!("png encode failed: {e}")))?;

    if encoded.len() < source.len() {
        Ok(encoded)
    } else {
        Ok(source.to_vec())
    }
}

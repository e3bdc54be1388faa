//! Image encoding: `DynamicImage` → PNG or JPEG bytes for storage.
//!
//! PNG is the default. It is lossless, and a 150 px rendering of a page is
//! small enough that JPEG's savings rarely matter. JPEG has no alpha channel,
//! so images are flattened to RGB before encoding.

use crate::config::ThumbnailFormat;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a thumbnail in `format`.
pub fn encode_thumbnail(
    img: &DynamicImage,
    format: ThumbnailFormat,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        ThumbnailFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut Cursor::new(&mut buf), format.image_format())?,
        ThumbnailFormat::Png => img.write_to(&mut Cursor::new(&mut buf), format.image_format())?,
    }
    debug!(
        "Encoded {}x{} thumbnail → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        format
    );
    Ok(buf)
}

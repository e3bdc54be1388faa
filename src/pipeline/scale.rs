//! Thumbnail scaling into a square bounding box.

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// Fit `img` into a `size`×`size` box, preserving aspect ratio.
///
/// Images that already fit are returned unchanged; there is no upscaling.
/// Otherwise the longer side becomes exactly `size` and the shorter side is
/// scaled proportionally (integer arithmetic, never below 1 px).
pub fn resize(img: DynamicImage, size: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if size == 0 || (width <= size && height <= size) {
        return img;
    }
    let (new_w, new_h) = fit_box(width, height, size);
    debug!("Scaling {}x{} → {}x{}", width, height, new_w, new_h);
    img.resize_exact(new_w, new_h, FilterType::Triangle)
}

fn fit_box(width: u32, height: u32, size: u32) -> (u32, u32) {
    let shorter = |short: u32, long: u32| {
        ((size as u64 * short as u64) / long as u64).max(1) as u32
    };
    if width >= height {
        (size, shorter(height, width))
    } else {
        (shorter(width, height), size)
    }
}

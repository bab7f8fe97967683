//! Image encoding: page `DynamicImage` → base64 PNG `ImageData`.
//!
//! Vision APIs take images as base64 payloads inside the JSON request body.
//! Handwriting is thin strokes on a light background; PNG keeps those edges
//! intact where JPEG ringing smears pencil marks into the paper texture.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// MIME type every encoded page is sent as.
pub const PAGE_MIME: &str = "image/png";

/// Encode one rasterised answer page for the grading request.
///
/// `detail: "high"` asks tiling models to look at the full-resolution image;
/// the low-detail overview tile is too coarse to read small handwritten digits.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&png);
    debug!(
        "Encoded {}x{} page → {} PNG bytes, {} base64 bytes",
        img.width(),
        img.height(),
        png.len(),
        b64.len()
    );

    Ok(ImageData::new(b64, PAGE_MIME).with_detail("high"))
}

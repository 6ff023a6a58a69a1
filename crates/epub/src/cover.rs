//! Cover image normalization.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Decode a cover image in any supported format and re-encode it as JPEG.
///
/// Returns `None` when the bytes cannot be decoded or encoded; a broken
/// cover means "no cover", never a failed extraction.
pub(crate) fn normalize(bytes: &[u8]) -> Option<Vec<u8>> {
    let decoded = match image::load_from_memory(bytes) {
        Ok(image) => image,
        Err(e) => {
            tracing::debug!(error = %e, "could not decode cover image");
            return None;
        },
    };
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut encoded = Vec::new();
    if let Err(e) = rgb.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg) {
        tracing::debug!(error = %e, "could not encode cover image");
        return None;
    }
    Some(encoded).filter(|e| !e.is_empty())
}

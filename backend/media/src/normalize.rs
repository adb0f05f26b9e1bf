//! Capture normalization: bounded downscale and lossy re-encode.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use medlens_core::ImagePayload;
use tracing::debug;

/// Long-edge bound for normalized captures, in pixels.
pub const MAX_LONG_EDGE: u32 = 1024;

/// JPEG quality used for every normalized capture (0.8 on a 0..1 scale).
pub const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub max_edge: u32,
    pub quality: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { max_edge: MAX_LONG_EDGE, quality: JPEG_QUALITY }
    }
}

/// Target dimensions for an image of `width` x `height` under a long-edge bound.
///
/// Images already within bound are returned unchanged. Otherwise the long edge
/// becomes `max_edge` and the short edge is `round(short * max_edge / long)`,
/// never less than one pixel.
pub fn scaled_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let long = width.max(height);
    if long <= max_edge {
        return (width, height);
    }
    let scale = |short: u32| -> u32 {
        ((short as f64 * max_edge as f64 / long as f64).round() as u32).max(1)
    };
    if width >= height {
        (max_edge, scale(height))
    } else {
        (scale(width), max_edge)
    }
}

/// Decode `bytes`, downscale to the bound, and re-encode as JPEG.
///
/// Always re-encodes, even when no scaling was needed. Orientation metadata is
/// not applied. Blocking; call from a blocking-capable context.
pub fn normalize_image(bytes: &[u8], options: NormalizeOptions) -> Result<ImagePayload> {
    let decoded = image::load_from_memory(bytes).context("Failed to decode image")?;
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        anyhow::bail!("Image has no pixels");
    }

    let (target_w, target_h) = scaled_dimensions(width, height, options.max_edge);
    let resized = if (target_w, target_h) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_w, target_h, FilterType::Triangle)
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, options.quality);
    rgb.write_with_encoder(encoder).context("Failed to encode JPEG")?;

    let data = out.into_inner();
    debug!(
        from = %format!("{width}x{height}"),
        to = %format!("{target_w}x{target_h}"),
        bytes = data.len(),
        "Normalized capture"
    );
    Ok(ImagePayload::new("image/jpeg", data))
}

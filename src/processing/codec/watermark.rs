//! Anchored text watermark drawn after resizing.

use std::path::{Path, PathBuf};
use ab_glyph::{FontArc, PxScale};
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::debug;

use crate::core::{WatermarkAnchor, WatermarkPolicy};
use crate::utils::ConfigError;
use super::RasterImage;

/// Distance in pixels between the text and the anchored edges.
pub const WATERMARK_MARGIN: i32 = 20;

/// Fonts tried, in order, when no font path is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads the configured font, or the first system font that parses.
pub fn load_font(path: Option<&Path>) -> Result<FontArc, ConfigError> {
    match path {
        Some(path) => read_font(path),
        None => SYSTEM_FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .filter(|p| p.is_file())
            .find_map(|p| read_font(&p).ok())
            .ok_or_else(|| ConfigError::watermark("no usable system font found; set a font path")),
    }
}

fn read_font(path: &Path) -> Result<FontArc, ConfigError> {
    let bytes = std::fs::read(path).map_err(|e| {
        ConfigError::watermark(format!("cannot read font {}: {e}", path.display()))
    })?;
    let font = FontArc::try_from_vec(bytes).map_err(|e| {
        ConfigError::watermark(format!("invalid font {}: {e}", path.display()))
    })?;
    debug!("Loaded watermark font {}", path.display());
    Ok(font)
}

/// Converts an opacity percentage to an 8-bit alpha value.
pub fn opacity_to_alpha(opacity: u8) -> u8 {
    ((u32::from(opacity.min(100)) * 255 + 50) / 100) as u8
}

/// Top-left corner of a `text` box placed at `anchor` on a `canvas`.
///
/// Coordinates are clamped so text wider than the image starts at the edge.
pub fn anchor_position(anchor: WatermarkAnchor, canvas: (u32, u32), text: (u32, u32)) -> (i32, i32) {
    let (cw, ch) = (canvas.0 as i32, canvas.1 as i32);
    let (tw, th) = (text.0 as i32, text.1 as i32);
    let m = WATERMARK_MARGIN;

    let (x, y) = match anchor {
        WatermarkAnchor::TopLeft => (m, m),
        WatermarkAnchor::TopRight => (cw - tw - m, m),
        WatermarkAnchor::BottomLeft => (m, ch - th - m),
        WatermarkAnchor::BottomRight => (cw - tw - m, ch - th - m),
        WatermarkAnchor::Center => ((cw - tw) / 2, (ch - th) / 2),
    };
    (x.max(0), y.max(0))
}

/// Draws the watermark text in white at the configured opacity.
///
/// Font size is in pixels of the image as it is now, so callers apply this
/// after resizing.
pub fn apply_watermark(image: RasterImage, policy: &WatermarkPolicy) -> RasterImage {
    let (width, height) = image.dimensions();
    let scale = PxScale::from(policy.font_size as f32);
    let text_box = text_size(scale, &policy.font, &policy.text);
    let (x, y) = anchor_position(policy.anchor, (width, height), text_box);
    debug!(
        "Watermark '{}' at ({}, {}) on {}x{}",
        policy.text, x, y, width, height
    );

    let mut overlay = RgbaImage::new(width, height);
    let color = Rgba([255, 255, 255, opacity_to_alpha(policy.opacity)]);
    draw_text_mut(&mut overlay, color, x, y, scale, &policy.font, &policy.text);

    let had_alpha = image.has_alpha();
    let mut canvas = image.pixels.to_rgba8();
    imageops::overlay(&mut canvas, &overlay, 0, 0);

    let pixels = if had_alpha {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
    };
    RasterImage { pixels, icc_profile: image.icc_profile }
}

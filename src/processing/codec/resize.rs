//! Resize logic mapping a `ResizePolicy` to Lanczos resampling.

use image::imageops::FilterType;
use tracing::debug;
use crate::core::ResizePolicy;
use super::RasterImage;

/// Width-based web sizes offered as presets.
pub const PRESET_WIDTHS: [u32; 4] = [1920, 1200, 800, 400];

/// Largest percentage accepted by `ResizePolicy::Percent`.
pub const MAX_PERCENT: u32 = 500;

/// Applies the resize described by `policy`.
///
/// Returns the image unchanged when the policy is `None` or the target
/// equals the current size.
pub fn apply_resize(image: RasterImage, policy: &ResizePolicy) -> RasterImage {
    let (width, height) = image.dimensions();
    match target_dimensions(width, height, policy) {
        Some((w, h)) if (w, h) != (width, height) => {
            debug!("Resizing {}x{} -> {}x{}", width, height, w, h);
            resample(&image, w, h)
        }
        _ => image,
    }
}

/// Resamples to exactly `width` x `height` with a Lanczos3 filter.
pub fn resample(image: &RasterImage, width: u32, height: u32) -> RasterImage {
    RasterImage {
        pixels: image.pixels.resize_exact(width.max(1), height.max(1), FilterType::Lanczos3),
        icc_profile: image.icc_profile.clone(),
    }
}

/// Output dimensions for a source of `width` x `height`, or `None` for no resize.
///
/// Every returned dimension is at least 1.
pub fn target_dimensions(width: u32, height: u32, policy: &ResizePolicy) -> Option<(u32, u32)> {
    match *policy {
        ResizePolicy::None => None,
        ResizePolicy::Preset { width: target_w, lock_aspect } => {
            let target_h = if lock_aspect {
                scale(height, f64::from(target_w) / f64::from(width))
            } else {
                height
            };
            Some((target_w.max(1), target_h))
        }
        ResizePolicy::Custom { width: w, height: h, lock_aspect: false } => {
            Some((w.unwrap_or(width).max(1), h.unwrap_or(height).max(1)))
        }
        ResizePolicy::Custom { width: w, height: h, lock_aspect: true } => match (w, h) {
            (None, None) => None,
            (Some(w), None) => Some((w.max(1), scale(height, f64::from(w) / f64::from(width)))),
            (None, Some(h)) => Some((scale(width, f64::from(h) / f64::from(height)), h.max(1))),
            (Some(w), Some(h)) => fit_within(width, height, w, h),
        },
        ResizePolicy::Percent(percent) => {
            let factor = f64::from(percent.clamp(1, MAX_PERCENT)) / 100.0;
            Some((scale(width, factor), scale(height, factor)))
        }
    }
}

/// Shrinks to fit inside `max_w` x `max_h`, keeping proportions; never enlarges.
fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> Option<(u32, u32)> {
    if width <= max_w && height <= max_h {
        return None;
    }
    let factor = (f64::from(max_w) / f64::from(width)).min(f64::from(max_h) / f64::from(height));
    Some((
        scale(width, factor).min(max_w.max(1)),
        scale(height, factor).min(max_h.max(1)),
    ))
}

fn scale(dimension: u32, factor: f64) -> u32 {
    ((f64::from(dimension) * factor).round() as u32).max(1)
}

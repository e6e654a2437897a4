//! Codec adapter over the `image` ecosystem.
//!
//! Uniform decode/encode/resample operations for every supported format.
//!
//! # Architecture
//!
//! - [`decode`] / [`strip_metadata`]: load bytes into a [`RasterImage`] and drop auxiliary data.
//! - [`formats`]: format-specific encoders, including the lossy quality dial.
//! - [`resize`]: maps a `ResizePolicy` to target dimensions and Lanczos resampling.
//! - [`cut`]: splits an image into two halves.
//! - [`watermark`]: draws anchored text onto the final image.

pub mod cut;
pub mod formats;
pub mod resize;
pub mod watermark;

use std::io::Cursor;
use image::{DynamicImage, ImageDecoder, ImageReader};
use tracing::debug;
use crate::utils::{ConvertError, ConvertResult};

pub use cut::cut;
pub use formats::encode;
pub use resize::{apply_resize, resample, target_dimensions};
pub use watermark::apply_watermark;

/// Decoded pixels plus the auxiliary data we know how to carry.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub pixels: DynamicImage,
    /// Embedded ICC colour profile, re-attached on encode unless stripped
    pub icc_profile: Option<Vec<u8>>,
}

impl RasterImage {
    pub fn new(pixels: DynamicImage) -> Self {
        Self { pixels, icc_profile: None }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn has_alpha(&self) -> bool {
        self.pixels.color().has_alpha()
    }
}

/// Decodes any supported format, sniffing the container from its bytes.
pub fn decode(bytes: &[u8]) -> ConvertResult<RasterImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConvertError::decode(format!("cannot read image data: {e}")))?;

    if reader.format().is_none() {
        return Err(ConvertError::decode("unrecognized image format"));
    }

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| ConvertError::decode(e.to_string()))?;

    let icc_profile = decoder
        .icc_profile()
        .unwrap_or_else(|e| {
            debug!("Ignoring unreadable ICC profile: {e}");
            None
        })
        .filter(|profile| {
            let rgb = is_rgb_profile(profile);
            if !rgb {
                debug!("Dropping non-RGB ICC profile; pixels are decoded to RGB");
            }
            rgb
        });

    let pixels = DynamicImage::from_decoder(decoder)
        .map_err(|e| ConvertError::decode(e.to_string()))?;

    Ok(RasterImage { pixels, icc_profile })
}

/// ICC header bytes 16..20 hold the data colour space signature.
fn is_rgb_profile(profile: &[u8]) -> bool {
    profile.get(16..20) == Some(b"RGB ".as_slice())
}

/// Drops embedded profiles and metadata; pixels are untouched.
pub fn strip_metadata(mut image: RasterImage) -> RasterImage {
    if image.icc_profile.take().is_some() {
        debug!("Stripped embedded ICC profile");
    }
    image
}

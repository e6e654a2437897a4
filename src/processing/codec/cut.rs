//! Splits an image into two halves along one axis.

use crate::core::{CutPart, CutPolicy};
use crate::utils::{ConvertError, ConvertResult};
use super::RasterImage;

/// Cuts `image` in half.
///
/// `Horizontal` yields top and bottom, `Vertical` yields left and right. For
/// odd sizes the second half gets the extra row or column. `CutPolicy::None`
/// returns the image as the single, unlabelled piece.
pub fn cut(image: RasterImage, policy: CutPolicy) -> ConvertResult<Vec<(Option<CutPart>, RasterImage)>> {
    let (width, height) = image.dimensions();
    match policy {
        CutPolicy::None => Ok(vec![(None, image)]),
        CutPolicy::Horizontal => {
            if height < 2 {
                return Err(ConvertError::transform(format!(
                    "cannot cut a {width}x{height} image horizontally"
                )));
            }
            let half = height / 2;
            Ok(vec![
                (Some(CutPart::Top), crop(&image, 0, 0, width, half)),
                (Some(CutPart::Bottom), crop(&image, 0, half, width, height - half)),
            ])
        }
        CutPolicy::Vertical => {
            if width < 2 {
                return Err(ConvertError::transform(format!(
                    "cannot cut a {width}x{height} image vertically"
                )));
            }
            let half = width / 2;
            Ok(vec![
                (Some(CutPart::Left), crop(&image, 0, 0, half, height)),
                (Some(CutPart::Right), crop(&image, half, 0, width - half, height)),
            ])
        }
    }
}

fn crop(image: &RasterImage, x: u32, y: u32, width: u32, height: u32) -> RasterImage {
    RasterImage {
        pixels: image.pixels.crop_imm(x, y, width, height),
        icc_profile: image.icc_profile.clone(),
    }
}

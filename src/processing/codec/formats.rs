//! Maps a target format and quality to the matching encoder.
//!
//! JPEG and WebP honour the quality dial; the lossless formats ignore it.

use std::io::Cursor;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use tracing::debug;

use crate::utils::{ConvertError, ConvertResult, ImageFormat};
use super::RasterImage;

type Result<T> = ConvertResult<T>;

/// Encodes `image` as `format`.
///
/// `quality` (1-100) applies to JPEG and WebP and is ignored otherwise.
pub fn encode(image: &RasterImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
    let quality = quality.clamp(1, 100);
    match format {
        ImageFormat::JPEG => encode_jpeg(image, quality),
        ImageFormat::WebP => encode_webp(image, quality),
        ImageFormat::PNG => encode_png(image),
        ImageFormat::BMP | ImageFormat::GIF | ImageFormat::TIFF => encode_lossless(image, format),
    }
}

/// Encodes as baseline JPEG. Transparency is flattened onto white.
fn encode_jpeg(image: &RasterImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = flatten_onto_white(&image.pixels);
    let mut buf = Vec::new();

    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    attach_icc_profile(&mut encoder, image, ImageFormat::JPEG);
    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| ConvertError::encode(format!("JPEG save failed: {e}")))?;

    Ok(buf)
}

/// libwebp effort level, 0 (fast) to 6 (smallest output)
const WEBP_METHOD: i32 = 6;

/// Encodes as lossy WebP via libwebp at maximum effort.
fn encode_webp(image: &RasterImage, quality: u8) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    let mut config = webp::WebPConfig::new()
        .map_err(|()| ConvertError::encode("WebP encoder configuration failed"))?;
    config.lossless = 0;
    config.quality = f32::from(quality);
    config.method = WEBP_METHOD;

    let encoded = if image.has_alpha() {
        let rgba = image.pixels.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_advanced(&config)
    } else {
        let rgb = image.pixels.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_advanced(&config)
    };
    let memory = encoded.map_err(|e| ConvertError::encode(format!("WebP save failed: {e:?}")))?;

    if image.icc_profile.is_some() {
        debug!("WebP encoder does not embed ICC profiles; profile dropped");
    }
    Ok(memory.to_vec())
}

/// Encodes as PNG with maximum compression and adaptive filtering.
fn encode_png(image: &RasterImage) -> Result<Vec<u8>> {
    let pixels = normalize_color(&image.pixels);
    let mut buf = Vec::new();

    let mut encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive);
    attach_icc_profile(&mut encoder, image, ImageFormat::PNG);
    encoder
        .write_image(pixels.as_bytes(), pixels.width(), pixels.height(), pixels.color().into())
        .map_err(|e| ConvertError::encode(format!("PNG save failed: {e}")))?;

    Ok(buf)
}

/// BMP, GIF and TIFF go through the generic writer.
fn encode_lossless(image: &RasterImage, format: ImageFormat) -> Result<Vec<u8>> {
    let pixels = normalize_color(&image.pixels);
    let mut cursor = Cursor::new(Vec::new());

    pixels
        .write_to(&mut cursor, format.to_image_format())
        .map_err(|e| ConvertError::encode(format!("{format} save failed: {e}")))?;

    Ok(cursor.into_inner())
}

fn attach_icc_profile<E: ImageEncoder>(encoder: &mut E, image: &RasterImage, format: ImageFormat) {
    if let Some(profile) = &image.icc_profile {
        if let Err(e) = encoder.set_icc_profile(profile.clone()) {
            debug!("{format} encoder cannot embed ICC profile: {e}");
        }
    }
}

/// 8-bit RGB or RGBA, whichever keeps the information the source has.
fn normalize_color(pixels: &DynamicImage) -> DynamicImage {
    match pixels {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => pixels.clone(),
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Composites any alpha channel over a white background.
fn flatten_onto_white(pixels: &DynamicImage) -> RgbImage {
    if !pixels.color().has_alpha() {
        return pixels.to_rgb8();
    }

    let rgba = pixels.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in rgb.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        *dst = Rgb([blend(r), blend(g), blend(b)]);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::codec::{decode, strip_metadata, test_images};

    #[test]
    fn lower_quality_gives_smaller_lossy_output() {
        let image = RasterImage::new(test_images::noise(96, 96, 7));
        for format in [ImageFormat::JPEG, ImageFormat::WebP] {
            let high = encode(&image, format, 95).unwrap();
            let low = encode(&image, format, 10).unwrap();
            assert!(low.len() < high.len(), "{format}: {} !< {}", low.len(), high.len());
        }
    }

    #[test]
    fn quality_is_ignored_for_lossless_formats() {
        let image = RasterImage::new(test_images::gradient(32, 32));
        for format in [ImageFormat::PNG, ImageFormat::BMP, ImageFormat::TIFF] {
            let a = encode(&image, format, 5).unwrap();
            let b = encode(&image, format, 100).unwrap();
            assert_eq!(a, b, "{format} output depends on quality");
        }
    }

    #[test]
    fn lossless_formats_preserve_pixels() {
        let image = RasterImage::new(test_images::gradient(16, 9));
        for format in [ImageFormat::PNG, ImageFormat::BMP, ImageFormat::TIFF] {
            let decoded = decode(&encode(&image, format, 50).unwrap()).unwrap();
            assert_eq!(decoded.pixels.to_rgb8(), image.pixels.to_rgb8(), "{format}");
        }
    }

    #[test]
    fn jpeg_flattens_transparency_onto_white() {
        let image = RasterImage::new(test_images::translucent(8, 8));
        let decoded = decode(&encode(&image, ImageFormat::JPEG, 100).unwrap()).unwrap();

        assert!(!decoded.has_alpha());
        // 50% red over white is roughly (255, 127, 127)
        let Rgb([r, g, b]) = *decoded.pixels.to_rgb8().get_pixel(4, 4);
        assert!(r > 240, "r = {r}");
        assert!((110..=145).contains(&g), "g = {g}");
        assert!((110..=145).contains(&b), "b = {b}");
    }

    /// Minimal ICC header: size, then the colour space signature at bytes 16..20
    fn fake_icc_profile(color_space: &[u8; 4]) -> Vec<u8> {
        let mut profile = vec![0u8; 128];
        profile[..4].copy_from_slice(&128u32.to_be_bytes());
        profile[12..16].copy_from_slice(b"mntr");
        profile[16..20].copy_from_slice(color_space);
        profile[36..40].copy_from_slice(b"acsp");
        profile
    }

    #[test]
    fn icc_profile_survives_unless_stripped() {
        let profile = fake_icc_profile(b"RGB ");
        let mut image = RasterImage::new(test_images::gradient(16, 16));
        image.icc_profile = Some(profile.clone());

        for format in [ImageFormat::JPEG, ImageFormat::PNG] {
            let kept = decode(&encode(&image, format, 90).unwrap()).unwrap();
            assert_eq!(kept.icc_profile.as_ref(), Some(&profile), "{format} lost the profile");

            let stripped = strip_metadata(image.clone());
            let dropped = decode(&encode(&stripped, format, 90).unwrap()).unwrap();
            assert!(dropped.icc_profile.is_none(), "{format} kept a stripped profile");
        }
    }

    #[test]
    fn non_rgb_profiles_are_not_carried_to_rgb_output() {
        let mut image = RasterImage::new(test_images::gradient(8, 8));
        image.icc_profile = Some(fake_icc_profile(b"CMYK"));

        let decoded = decode(&encode(&image, ImageFormat::PNG, 90).unwrap()).unwrap();
        assert!(decoded.icc_profile.is_none());
    }

    #[test]
    fn webp_keeps_alpha_and_dimensions() {
        let image = RasterImage::new(test_images::translucent(24, 10));
        let bytes = encode(&image, ImageFormat::WebP, 80).unwrap();

        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (24, 10));
        assert!(decoded.has_alpha());
    }

    #[test]
    fn png_keeps_alpha() {
        let image = RasterImage::new(test_images::translucent(4, 4));
        let decoded = decode(&encode(&image, ImageFormat::PNG, 90).unwrap()).unwrap();
        assert!(decoded.has_alpha());
        assert_eq!(decoded.pixels.to_rgba8().get_pixel(0, 0).0, [255, 0, 0, 128]);
    }
}

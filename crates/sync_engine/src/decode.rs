//! Frame → 8-bit grayscale conversion.
//!
//! The tracking engine consumes mono images; color frames are converted
//! with the `image` crate's luma weights.

use contracts::{ContractError, Frame, ImageFormat, StereoSide};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

/// Decode a frame into a grayscale image.
///
/// # Errors
/// Zero-sized geometry or a pixel buffer whose length does not match
/// `width * height * channels`.
pub fn to_mono8(side: StereoSide, frame: &Frame) -> Result<GrayImage, ContractError> {
    let image = &frame.image;
    let fail = |message: String| ContractError::decode(side, frame.timestamp, message);

    if image.width == 0 || image.height == 0 {
        return Err(fail(format!(
            "empty geometry {}x{}",
            image.width, image.height
        )));
    }

    let expected = image.expected_len().ok_or_else(|| {
        fail(format!(
            "geometry {}x{} {:?} overflows the addressable size",
            image.width, image.height, image.format
        ))
    })?;
    if image.data.len() != expected {
        return Err(fail(format!(
            "{:?} {}x{} needs {} bytes, got {}",
            image.format,
            image.width,
            image.height,
            expected,
            image.data.len()
        )));
    }

    let (w, h) = (image.width, image.height);
    let raw = &image.data[..];
    let mismatch = || fail("pixel buffer rejected".to_string());

    let gray = match image.format {
        ImageFormat::Mono8 => GrayImage::from_raw(w, h, raw.to_vec()).ok_or_else(mismatch)?,
        ImageFormat::Rgb8 => {
            let rgb = RgbImage::from_raw(w, h, raw.to_vec()).ok_or_else(mismatch)?;
            DynamicImage::ImageRgb8(rgb).to_luma8()
        }
        ImageFormat::Bgr8 => {
            let rgb = RgbImage::from_raw(w, h, swap_red_blue(raw, 3)).ok_or_else(mismatch)?;
            DynamicImage::ImageRgb8(rgb).to_luma8()
        }
        ImageFormat::Rgba8 => {
            let rgba = RgbaImage::from_raw(w, h, raw.to_vec()).ok_or_else(mismatch)?;
            DynamicImage::ImageRgba8(rgba).to_luma8()
        }
        ImageFormat::Bgra8 => {
            let rgba = RgbaImage::from_raw(w, h, swap_red_blue(raw, 4)).ok_or_else(mismatch)?;
            DynamicImage::ImageRgba8(rgba).to_luma8()
        }
    };

    Ok(gray)
}

fn swap_red_blue(raw: &[u8], stride: usize) -> Vec<u8> {
    let mut out = raw.to_vec();
    for px in out.chunks_exact_mut(stride) {
        px.swap(0, 2);
    }
    out
}

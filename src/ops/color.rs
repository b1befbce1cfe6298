//! Color-space conversions.
//!
//! All conversions follow the 8-bit conventions of the original service:
//! grayscale uses BT.601 luminance weights, HSV packs hue into 0..=179
//! with saturation and value in 0..=255, and LAB scales L to 0..=255 with
//! the a/b components offset by 128.

use crate::buffer::RasterBuffer;
use crate::core::Result;
use image::{Rgb, RgbImage};
use serde::Deserialize;

/// Target color space for the `colorspace` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorSpace {
    /// Identity: buffers are already RGB-ordered.
    Rgb,
    /// Hue/saturation/value packed into three 8-bit channels.
    Hsv,
    /// CIELAB packed into three 8-bit channels.
    Lab,
}

/// Converts the buffer to single-channel grayscale.
///
/// Idempotent: grayscale input is returned unchanged.
pub fn grayscale(buffer: &RasterBuffer) -> Result<RasterBuffer> {
    Ok(RasterBuffer::Gray(buffer.to_gray()))
}

/// Converts the buffer into the requested color space.
///
/// Output is always three channels; grayscale input is expanded by channel
/// replication before conversion.
pub fn colorspace(buffer: &RasterBuffer, space: ColorSpace) -> Result<RasterBuffer> {
    let rgb = buffer.to_rgb();
    let converted = match space {
        ColorSpace::Rgb => rgb,
        ColorSpace::Hsv => map_pixels(&rgb, rgb_to_hsv),
        ColorSpace::Lab => map_pixels(&rgb, rgb_to_lab),
    };
    RasterBuffer::from_rgb(converted)
}

fn map_pixels(rgb: &RgbImage, f: fn([u8; 3]) -> [u8; 3]) -> RgbImage {
    let mut out = RgbImage::new(rgb.width(), rgb.height());
    for (x, y, pixel) in rgb.enumerate_pixels() {
        out.put_pixel(x, y, Rgb(f(pixel.0)));
    }
    out
}

/// 8-bit HSV: H in 0..=179 (degrees halved), S and V in 0..=255.
fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = v - min;

    let s = if v > 0.0 { delta / v * 255.0 } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / delta
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    [
        (h / 2.0).round().clamp(0.0, 179.0) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    ]
}

/// 8-bit CIELAB under D65: L scaled to 0..=255, a and b offset by 128.
fn rgb_to_lab([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);

    let x = (0.412453 * rf + 0.357580 * gf + 0.180423 * bf) / 0.950456;
    let y = 0.212671 * rf + 0.715160 * gf + 0.072169 * bf;
    let z = (0.019334 * rf + 0.119193 * gf + 0.950227 * bf) / 1.088754;

    let l = if y > 0.008856 {
        116.0 * y.cbrt() - 16.0
    } else {
        903.3 * y
    };
    let a = 500.0 * (lab_f(x) - lab_f(y));
    let b_comp = 200.0 * (lab_f(y) - lab_f(z));

    [
        (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        (a + 128.0).round().clamp(0.0, 255.0) as u8,
        (b_comp + 128.0).round().clamp(0.0, 255.0) as u8,
    ]
}

fn lab_f(t: f32) -> f32 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn grayscale_is_idempotent() {
        let rgb = RgbImage::from_fn(8, 8, |x, y| Rgb([x as u8 * 30, y as u8 * 30, 100]));
        let buffer = RasterBuffer::from_rgb(rgb).unwrap();

        let once = grayscale(&buffer).unwrap();
        let twice = grayscale(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.channels(), 1);
    }

    #[test]
    fn grayscale_matches_weighted_conversion() {
        let buffer = RasterBuffer::from_rgb(RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]))).unwrap();
        let out = grayscale(&buffer).unwrap();
        match out {
            RasterBuffer::Gray(gray) => assert_eq!(gray.get_pixel(0, 0).0[0], 76), // 0.299 * 255
            _ => panic!("expected gray output"),
        }
    }

    #[test]
    fn hsv_of_pure_red() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
    }

    #[test]
    fn hsv_of_pure_green_and_blue() {
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
    }

    #[test]
    fn hsv_of_gray_has_zero_saturation() {
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn lab_of_white_and_black() {
        assert_eq!(rgb_to_lab([255, 255, 255]), [255, 128, 128]);
        assert_eq!(rgb_to_lab([0, 0, 0]), [0, 128, 128]);
    }

    #[test]
    fn colorspace_preserves_dimensions_and_expands_gray() {
        let gray = GrayImage::from_pixel(5, 4, Luma([200]));
        let buffer = RasterBuffer::from_gray(gray).unwrap();
        for space in [ColorSpace::Rgb, ColorSpace::Hsv, ColorSpace::Lab] {
            let out = colorspace(&buffer, space).unwrap();
            assert_eq!(out.dimensions(), (5, 4));
            assert_eq!(out.channels(), 3);
        }
    }

    #[test]
    fn colorspace_rgb_is_identity_on_rgb_input() {
        let rgb = RgbImage::from_fn(4, 4, |x, y| Rgb([x as u8, y as u8, 9]));
        let buffer = RasterBuffer::from_rgb(rgb.clone()).unwrap();
        let out = colorspace(&buffer, ColorSpace::Rgb).unwrap();
        assert_eq!(out, RasterBuffer::Rgb(rgb));
    }
}

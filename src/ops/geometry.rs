//! Geometric transforms: translation, rotation about center, resize and crop.
//!
//! Translation and rotation keep the input dimensions; samples brought in
//! from outside the canvas are filled with the zero background value.

use crate::buffer::RasterBuffer;
use crate::core::{ProcessError, Result};
use image::{imageops, Luma, Rgb};
use imageproc::geometric_transformations::{rotate_about_center, warp, Interpolation, Projection};

/// Margin removed from each side when `resize_crop` is asked to crop.
pub const CROP_MARGIN: u32 = 10;

/// Translates by `(tx, ty)` and then rotates about the image center by
/// `angle` degrees (positive = counter-clockwise).
///
/// Output dimensions are identical to the input; uncovered samples are
/// filled with zero.
pub fn transform(buffer: &RasterBuffer, tx: i32, ty: i32, angle: f32) -> Result<RasterBuffer> {
    let mut out = buffer.clone();

    if tx != 0 || ty != 0 {
        let projection = Projection::translate(tx as f32, ty as f32);
        out = match out {
            RasterBuffer::Gray(img) => RasterBuffer::Gray(warp(
                &img,
                &projection,
                Interpolation::Bilinear,
                Luma([0u8]),
            )),
            RasterBuffer::Rgb(img) => RasterBuffer::Rgb(warp(
                &img,
                &projection,
                Interpolation::Bilinear,
                Rgb([0u8, 0, 0]),
            )),
        };
    }

    if angle != 0.0 {
        // rotate_about_center is clockwise for positive theta; negate to
        // keep positive angles counter-clockwise.
        let theta = -angle.to_radians();
        out = match out {
            RasterBuffer::Gray(img) => RasterBuffer::Gray(rotate_about_center(
                &img,
                theta,
                Interpolation::Bilinear,
                Luma([0u8]),
            )),
            RasterBuffer::Rgb(img) => RasterBuffer::Rgb(rotate_about_center(
                &img,
                theta,
                Interpolation::Bilinear,
                Rgb([0u8, 0, 0]),
            )),
        };
    }

    Ok(out)
}

/// Resizes to exactly `width` x `height` (bilinear); when `crop` is set,
/// removes a fixed [`CROP_MARGIN`] from each side afterwards.
pub fn resize_crop(buffer: &RasterBuffer, width: u32, height: u32, crop: bool) -> Result<RasterBuffer> {
    if width == 0 || height == 0 {
        return Err(ProcessError::invalid_parameter(format!(
            "resize target must be at least 1x1, got {}x{}",
            width, height
        )));
    }
    if crop && (width <= 2 * CROP_MARGIN || height <= 2 * CROP_MARGIN) {
        return Err(ProcessError::invalid_parameter(format!(
            "crop requires both target dimensions above {}, got {}x{}",
            2 * CROP_MARGIN,
            width,
            height
        )));
    }

    let resized = buffer.resize(width, height);
    if !crop {
        return Ok(resized);
    }

    let (cw, ch) = (width - 2 * CROP_MARGIN, height - 2 * CROP_MARGIN);
    let cropped = match resized {
        RasterBuffer::Gray(img) => {
            RasterBuffer::Gray(imageops::crop_imm(&img, CROP_MARGIN, CROP_MARGIN, cw, ch).to_image())
        }
        RasterBuffer::Rgb(img) => {
            RasterBuffer::Rgb(imageops::crop_imm(&img, CROP_MARGIN, CROP_MARGIN, cw, ch).to_image())
        }
    };
    Ok(cropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn checker(width: u32, height: u32) -> RasterBuffer {
        RasterBuffer::from_rgb(RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        }))
        .unwrap()
    }

    #[test]
    fn transform_preserves_dimensions() {
        let buffer = checker(31, 17);
        let out = transform(&buffer, 5, -3, 30.0).unwrap();
        assert_eq!(out.dimensions(), (31, 17));
        assert_eq!(out.channels(), 3);
    }

    #[test]
    fn translate_fills_background_with_zero() {
        let buffer = RasterBuffer::from_rgb(RgbImage::from_pixel(8, 8, Rgb([200, 200, 200]))).unwrap();
        let out = transform(&buffer, 4, 0, 0.0).unwrap();
        match out {
            RasterBuffer::Rgb(img) => {
                // Left half was vacated by the shift.
                assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
                assert_eq!(img.get_pixel(7, 7).0, [200, 200, 200]);
            }
            _ => panic!("expected rgb output"),
        }
    }

    #[test]
    fn zero_transform_is_identity() {
        let buffer = checker(6, 6);
        let out = transform(&buffer, 0, 0, 0.0).unwrap();
        assert_eq!(out, buffer);
    }

    #[test]
    fn resize_hits_exact_target() {
        let buffer = checker(33, 21);
        let out = resize_crop(&buffer, 100, 50, false).unwrap();
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn resize_crop_removes_margin() {
        let buffer = checker(33, 21);
        let out = resize_crop(&buffer, 100, 100, true).unwrap();
        assert_eq!(out.dimensions(), (80, 80));
    }

    #[test]
    fn crop_rejects_small_targets() {
        let buffer = checker(10, 10);
        assert!(resize_crop(&buffer, 20, 100, true).is_err());
        assert!(resize_crop(&buffer, 100, 20, true).is_err());
        // Same targets without crop are fine.
        assert!(resize_crop(&buffer, 20, 100, false).is_ok());
    }

    #[test]
    fn resize_rejects_zero_target() {
        let buffer = checker(10, 10);
        assert!(resize_crop(&buffer, 0, 10, false).is_err());
        assert!(resize_crop(&buffer, 10, 0, false).is_err());
    }
}

//! Thresholding, morphology, and edge detection.
//!
//! Every operation in this family works on a single-channel derivation of
//! the input (color input is collapsed to grayscale internally) and
//! produces a single-channel output of identical dimensions.

use crate::buffer::RasterBuffer;
use crate::core::Result;
use image::GrayImage;
use imageproc::contrast::{adaptive_threshold, threshold, ThresholdType};
use imageproc::edges::canny;
use imageproc::gradients::horizontal_sobel;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

/// Fixed binary threshold level.
const BINARY_THRESHOLD: u8 = 127;
/// Adaptive threshold block radius (an 11x11 window).
const ADAPTIVE_BLOCK_RADIUS: u32 = 5;
/// Structuring element radius (a 5x5 square).
const MORPH_RADIUS: u8 = 2;
/// Canny hysteresis thresholds.
const CANNY_LOW: f32 = 100.0;
const CANNY_HIGH: f32 = 200.0;

/// Binary threshold at the fixed level: above goes white, rest black.
pub fn threshold_binary(buffer: &RasterBuffer) -> Result<RasterBuffer> {
    let gray = buffer.to_gray();
    Ok(RasterBuffer::Gray(threshold(
        &gray,
        BINARY_THRESHOLD,
        ThresholdType::Binary,
    )))
}

/// Mean adaptive threshold over an 11x11 neighborhood.
pub fn threshold_adaptive(buffer: &RasterBuffer) -> Result<RasterBuffer> {
    let gray = buffer.to_gray();
    Ok(RasterBuffer::Gray(adaptive_threshold(
        &gray,
        ADAPTIVE_BLOCK_RADIUS,
    )))
}

/// Grayscale dilation with a 5x5 square structuring element.
pub fn dilate(buffer: &RasterBuffer) -> Result<RasterBuffer> {
    let gray = buffer.to_gray();
    Ok(RasterBuffer::Gray(grayscale_dilate(
        &gray,
        &Mask::square(MORPH_RADIUS),
    )))
}

/// Grayscale erosion with a 5x5 square structuring element.
pub fn erode(buffer: &RasterBuffer) -> Result<RasterBuffer> {
    let gray = buffer.to_gray();
    Ok(RasterBuffer::Gray(grayscale_erode(
        &gray,
        &Mask::square(MORPH_RADIUS),
    )))
}

/// Canny edge detection with fixed hysteresis thresholds.
pub fn edges_canny(buffer: &RasterBuffer) -> Result<RasterBuffer> {
    let gray = buffer.to_gray();
    Ok(RasterBuffer::Gray(canny(&gray, CANNY_LOW, CANNY_HIGH)))
}

/// Horizontal Sobel gradient, scale-absed back into u8.
pub fn edges_sobel(buffer: &RasterBuffer) -> Result<RasterBuffer> {
    let gray = buffer.to_gray();
    let gradients = horizontal_sobel(&gray);
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gradients.enumerate_pixels() {
        let magnitude = pixel.0[0].unsigned_abs().min(255) as u8;
        out.put_pixel(x, y, image::Luma([magnitude]));
    }
    Ok(RasterBuffer::Gray(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn split_field() -> RasterBuffer {
        // Left half dark, right half bright.
        RasterBuffer::from_rgb(RgbImage::from_fn(20, 10, |x, _| {
            if x < 10 {
                Rgb([30, 30, 30])
            } else {
                Rgb([220, 220, 220])
            }
        }))
        .unwrap()
    }

    #[test]
    fn family_outputs_are_single_channel_same_shape() {
        let buffer = split_field();
        for out in [
            threshold_binary(&buffer).unwrap(),
            threshold_adaptive(&buffer).unwrap(),
            dilate(&buffer).unwrap(),
            erode(&buffer).unwrap(),
            edges_canny(&buffer).unwrap(),
            edges_sobel(&buffer).unwrap(),
        ] {
            assert_eq!(out.channels(), 1);
            assert_eq!(out.dimensions(), (20, 10));
        }
    }

    #[test]
    fn binary_threshold_splits_at_fixed_level() {
        let out = threshold_binary(&split_field()).unwrap();
        match out {
            RasterBuffer::Gray(img) => {
                assert_eq!(img.get_pixel(2, 5).0[0], 0);
                assert_eq!(img.get_pixel(15, 5).0[0], 255);
            }
            _ => panic!("expected gray output"),
        }
    }

    #[test]
    fn dilate_grows_and_erode_shrinks_bright_regions() {
        let mut gray = GrayImage::from_pixel(11, 11, Luma([0]));
        gray.put_pixel(5, 5, Luma([255]));
        let buffer = RasterBuffer::from_gray(gray).unwrap();

        let dilated = dilate(&buffer).unwrap();
        match &dilated {
            RasterBuffer::Gray(img) => {
                assert_eq!(img.get_pixel(3, 3).0[0], 255);
                assert_eq!(img.get_pixel(0, 0).0[0], 0);
            }
            _ => panic!("expected gray output"),
        }

        let eroded = erode(&dilated).unwrap();
        match eroded {
            RasterBuffer::Gray(img) => {
                // The single bright pixel survives a dilate-then-erode round trip.
                assert_eq!(img.get_pixel(5, 5).0[0], 255);
                assert_eq!(img.get_pixel(2, 2).0[0], 0);
            }
            _ => panic!("expected gray output"),
        }
    }

    #[test]
    fn canny_marks_the_vertical_boundary() {
        let out = edges_canny(&split_field()).unwrap();
        match out {
            RasterBuffer::Gray(img) => {
                let boundary_hits = (0..10)
                    .filter(|&y| (8..12).any(|x| img.get_pixel(x, y).0[0] == 255))
                    .count();
                assert!(boundary_hits > 5, "boundary hits: {}", boundary_hits);
            }
            _ => panic!("expected gray output"),
        }
    }

    #[test]
    fn sobel_is_zero_on_flat_input() {
        let flat = RasterBuffer::from_gray(GrayImage::from_pixel(9, 9, Luma([99]))).unwrap();
        let out = edges_sobel(&flat).unwrap();
        match out {
            RasterBuffer::Gray(img) => assert_eq!(img.get_pixel(4, 4).0[0], 0),
            _ => panic!("expected gray output"),
        }
    }
}

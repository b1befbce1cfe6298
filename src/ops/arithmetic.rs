//! Arithmetic and bitwise combination against a synthesized constant buffer.
//!
//! The second operand is a buffer of the same shape filled with a fixed
//! level. Add and subtract saturate at the sample range bounds. An
//! unrecognized operator returns the input unchanged rather than failing.

use crate::buffer::RasterBuffer;
use crate::core::Result;
use image::{GrayImage, RgbImage};

/// Level of the synthesized constant operand buffer.
const CONSTANT_LEVEL: u8 = 50;

/// Applies the named arithmetic/bitwise operator against the constant
/// buffer. Dimensions and channel count are preserved.
pub fn arithmetic(buffer: &RasterBuffer, op: &str) -> Result<RasterBuffer> {
    let apply: fn(u8) -> u8 = match op {
        "add" => |s| s.saturating_add(CONSTANT_LEVEL),
        "subtract" => |s| s.saturating_sub(CONSTANT_LEVEL),
        "bitwise_and" => |s| s & CONSTANT_LEVEL,
        "bitwise_or" => |s| s | CONSTANT_LEVEL,
        _ => return Ok(buffer.clone()),
    };

    let out = match buffer {
        RasterBuffer::Gray(img) => {
            let samples: Vec<u8> = img.as_raw().iter().map(|&s| apply(s)).collect();
            RasterBuffer::Gray(
                GrayImage::from_raw(img.width(), img.height(), samples)
                    .expect("sample count unchanged"),
            )
        }
        RasterBuffer::Rgb(img) => {
            let samples: Vec<u8> = img.as_raw().iter().map(|&s| apply(s)).collect();
            RasterBuffer::Rgb(
                RgbImage::from_raw(img.width(), img.height(), samples)
                    .expect("sample count unchanged"),
            )
        }
    };
    Ok(out)
}

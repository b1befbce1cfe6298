//! The decoded raster image shared by every component of the pipeline.
//!
//! A [`RasterBuffer`] is a 2-D array of 8-bit samples with either one
//! channel (grayscale) or three (RGB, fixed channel order system-wide).
//! Buffers are never mutated in place by operations; every transform
//! returns a new buffer.

use crate::core::{validate_image_dimensions, ProcessError, Result};
use image::{imageops, DynamicImage, ExtendedColorType, GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// BT.601 luminance weights used for every color-to-gray derivation.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// An in-memory decoded image: width x height x {1,3} channels of u8.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterBuffer {
    /// Single-channel (grayscale) image.
    Gray(GrayImage),
    /// Three-channel image in RGB order.
    Rgb(RgbImage),
}

impl RasterBuffer {
    /// Decodes image bytes into a buffer.
    ///
    /// Single-channel sources stay grayscale; everything else (including
    /// sources with an alpha channel) is flattened into a three-channel
    /// RGB representation.
    ///
    /// # Errors
    ///
    /// Returns `ImageLoad` if the bytes are not a decodable image, or
    /// `InvalidParameter` if the decoded image has zero area.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Self::from_dynamic(decoded)
    }

    /// Wraps an already-decoded [`DynamicImage`].
    pub fn from_dynamic(decoded: DynamicImage) -> Result<Self> {
        let buffer = match decoded {
            DynamicImage::ImageLuma8(gray) => RasterBuffer::Gray(gray),
            DynamicImage::ImageLumaA8(gray_alpha) => {
                RasterBuffer::Gray(DynamicImage::ImageLumaA8(gray_alpha).to_luma8())
            }
            other => RasterBuffer::Rgb(other.to_rgb8()),
        };
        validate_image_dimensions(buffer.width(), buffer.height())?;
        Ok(buffer)
    }

    /// Wraps a grayscale image, validating that it has non-zero area.
    pub fn from_gray(gray: GrayImage) -> Result<Self> {
        validate_image_dimensions(gray.width(), gray.height())?;
        Ok(RasterBuffer::Gray(gray))
    }

    /// Wraps an RGB image, validating that it has non-zero area.
    pub fn from_rgb(rgb: RgbImage) -> Result<Self> {
        validate_image_dimensions(rgb.width(), rgb.height())?;
        Ok(RasterBuffer::Rgb(rgb))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        match self {
            RasterBuffer::Gray(img) => img.width(),
            RasterBuffer::Rgb(img) => img.width(),
        }
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            RasterBuffer::Gray(img) => img.height(),
            RasterBuffer::Rgb(img) => img.height(),
        }
    }

    /// (width, height) in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Channel count: 1 for grayscale, 3 for RGB.
    pub fn channels(&self) -> u8 {
        match self {
            RasterBuffer::Gray(_) => 1,
            RasterBuffer::Rgb(_) => 3,
        }
    }

    /// Returns a three-channel view of the buffer, expanding grayscale by
    /// channel replication. RGB buffers are cloned unchanged.
    pub fn to_rgb(&self) -> RgbImage {
        match self {
            RasterBuffer::Rgb(img) => img.clone(),
            RasterBuffer::Gray(img) => {
                let mut rgb = RgbImage::new(img.width(), img.height());
                for (x, y, pixel) in img.enumerate_pixels() {
                    let v = pixel.0[0];
                    rgb.put_pixel(x, y, image::Rgb([v, v, v]));
                }
                rgb
            }
        }
    }

    /// Returns a single-channel view of the buffer.
    ///
    /// Color input is collapsed with the BT.601 luminance weights,
    /// matching the conventional weighted conversion; grayscale input is
    /// cloned unchanged.
    pub fn to_gray(&self) -> GrayImage {
        match self {
            RasterBuffer::Gray(img) => img.clone(),
            RasterBuffer::Rgb(img) => {
                let mut gray = GrayImage::new(img.width(), img.height());
                for (x, y, pixel) in img.enumerate_pixels() {
                    gray.put_pixel(x, y, image::Luma([luma(pixel.0)]));
                }
                gray
            }
        }
    }

    /// Resizes the buffer to exactly `width` x `height` with bilinear
    /// interpolation, preserving the channel count.
    pub fn resize(&self, width: u32, height: u32) -> RasterBuffer {
        match self {
            RasterBuffer::Gray(img) => RasterBuffer::Gray(imageops::resize(
                img,
                width,
                height,
                imageops::FilterType::Triangle,
            )),
            RasterBuffer::Rgb(img) => RasterBuffer::Rgb(imageops::resize(
                img,
                width,
                height,
                imageops::FilterType::Triangle,
            )),
        }
    }

    /// Encodes the buffer as PNG, the canonical exchange format for batch
    /// outputs and single-image responses.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.encode(ImageFormat::Png)
    }

    /// Encodes the buffer into the given raster container.
    pub fn encode(&self, format: ImageFormat) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        match self {
            RasterBuffer::Gray(img) => image::write_buffer_with_format(
                &mut cursor,
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::L8,
                format,
            ),
            RasterBuffer::Rgb(img) => image::write_buffer_with_format(
                &mut cursor,
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::Rgb8,
                format,
            ),
        }
        .map_err(|e| ProcessError::transform_failed(format!("encode {:?}", format), e))?;
        Ok(cursor.into_inner())
    }
}

/// BT.601 weighted luminance of one RGB pixel.
pub(crate) fn luma(rgb: [u8; 3]) -> u8 {
    let y = LUMA_WEIGHTS[0] * rgb[0] as f32
        + LUMA_WEIGHTS[1] * rgb[1] as f32
        + LUMA_WEIGHTS[2] * rgb[2] as f32;
    y.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, Rgba, RgbaImage};

    fn gradient_rgb(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn decode_flattens_alpha_to_rgb() {
        let rgba = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 128]));
        let mut bytes = Cursor::new(Vec::new());
        rgba.write_to(&mut bytes, ImageFormat::Png).unwrap();

        let buffer = RasterBuffer::decode(&bytes.into_inner()).unwrap();
        assert_eq!(buffer.channels(), 3);
        assert_eq!(buffer.dimensions(), (4, 3));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = RasterBuffer::decode(b"not an image").unwrap_err();
        assert!(matches!(err, ProcessError::ImageLoad(_)));
    }

    #[test]
    fn gray_expansion_replicates_channels() {
        let gray = GrayImage::from_pixel(2, 2, Luma([77]));
        let buffer = RasterBuffer::from_gray(gray).unwrap();
        let rgb = buffer.to_rgb();
        assert_eq!(rgb.get_pixel(1, 1).0, [77, 77, 77]);
    }

    #[test]
    fn to_gray_uses_bt601_weights() {
        let rgb = RgbImage::from_pixel(1, 1, Rgb([200, 100, 50]));
        let buffer = RasterBuffer::from_rgb(rgb).unwrap();
        let gray = buffer.to_gray();
        // 0.299*200 + 0.587*100 + 0.114*50 = 124.2 -> 124
        assert_eq!(gray.get_pixel(0, 0).0[0], 124);
    }

    #[test]
    fn resize_preserves_channel_count() {
        let buffer = RasterBuffer::from_rgb(gradient_rgb(20, 10)).unwrap();
        let resized = buffer.resize(5, 8);
        assert_eq!(resized.dimensions(), (5, 8));
        assert_eq!(resized.channels(), 3);

        let gray = RasterBuffer::Gray(buffer.to_gray()).resize(3, 3);
        assert_eq!(gray.channels(), 1);
    }

    #[test]
    fn zero_area_is_rejected() {
        assert!(RasterBuffer::from_gray(GrayImage::new(0, 5)).is_err());
        assert!(RasterBuffer::from_rgb(RgbImage::new(5, 0)).is_err());
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let buffer = RasterBuffer::from_rgb(gradient_rgb(16, 16)).unwrap();
        let bytes = buffer.encode_png().unwrap();
        let back = RasterBuffer::decode(&bytes).unwrap();
        assert_eq!(back, buffer);
    }
}

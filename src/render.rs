//! The comparison and export renderer.
//!
//! Comparison mode reconciles a source buffer and a derived buffer
//! (channel depth by replication, dimensions by resizing the derived half
//! only) into one labeled side-by-side artifact. Export mode re-encodes a
//! buffer into a requested raster container or a single-page PDF.

use crate::buffer::RasterBuffer;
use crate::core::{validate_range, ProcessError, Result};
use crate::ops::draw_label;
use crate::pdf::{self, PdfSettings};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ExtendedColorType, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Height of the label strip prepended above the two halves.
pub const LABEL_STRIP_HEIGHT: u32 = 30;

const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_SCALE: u32 = 2;

/// Composes `[label strip][source | derived]` into one artifact.
///
/// The derived buffer is resized to the source's dimensions and expanded
/// to three channels by replication when needed; the source is never
/// resized. Output: width `2 * source_width`, height
/// `source_height + LABEL_STRIP_HEIGHT`, three channels.
pub fn compare(
    source: &RasterBuffer,
    derived: &RasterBuffer,
    operation_name: &str,
) -> Result<RasterBuffer> {
    let (width, height) = source.dimensions();
    debug!(
        source_w = width,
        source_h = height,
        derived_w = derived.width(),
        derived_h = derived.height(),
        derived_channels = derived.channels(),
        "composing comparison artifact"
    );

    let source_half = source.to_rgb();
    let derived_half = derived.resize(width, height).to_rgb();

    let mut canvas = RgbImage::new(width * 2, height + LABEL_STRIP_HEIGHT);
    imageops::replace(&mut canvas, &source_half, 0, LABEL_STRIP_HEIGHT as i64);
    imageops::replace(
        &mut canvas,
        &derived_half,
        width as i64,
        LABEL_STRIP_HEIGHT as i64,
    );

    let label_y = (LABEL_STRIP_HEIGHT as i32 - 7 * LABEL_SCALE as i32) / 2;
    draw_label(
        &mut canvas,
        "Original",
        (width / 4) as i32,
        label_y,
        LABEL_SCALE,
        LABEL_COLOR,
    );
    draw_label(
        &mut canvas,
        &format!("Processed ({})", operation_name),
        (width + width / 4) as i32,
        label_y,
        LABEL_SCALE,
        LABEL_COLOR,
    );

    RasterBuffer::from_rgb(canvas)
}

/// Encode target for the export renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
    Bmp,
    Tiff,
    WebP,
    Pdf,
}

impl ExportFormat {
    /// Parses a caller-supplied format string (case-insensitive).
    pub fn parse(format: &str) -> Result<Self> {
        match format.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            "tif" | "tiff" => Ok(Self::Tiff),
            "webp" => Ok(Self::WebP),
            "pdf" => Ok(Self::Pdf),
            other => Err(ProcessError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }

    /// MIME type of the encoded artifact.
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::WebP => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::WebP => "webp",
            Self::Pdf => "pdf",
        }
    }
}

/// Encoded bytes plus the metadata the external layer needs to stream
/// them back.
#[derive(Debug)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
    pub filename: String,
}

/// Re-encodes a buffer into the requested container.
///
/// `quality` (1..=100) only affects the lossy JPEG path (including the
/// JPEG embedded in a PDF page) and is ignored otherwise.
pub fn export(buffer: &RasterBuffer, format: &str, quality: u8) -> Result<EncodedArtifact> {
    let format = ExportFormat::parse(format)?;
    validate_range(quality as i64, 1, 100, "quality")?;

    let bytes = match format {
        ExportFormat::Jpeg => encode_jpeg(buffer, quality)?,
        ExportFormat::Pdf => {
            let jpeg = encode_jpeg(buffer, quality)?;
            pdf::write_single_page(&jpeg, buffer.dimensions(), &PdfSettings::default())?
        }
        ExportFormat::Png => buffer.encode(ImageFormat::Png)?,
        ExportFormat::Bmp => buffer.encode(ImageFormat::Bmp)?,
        ExportFormat::Tiff => buffer.encode(ImageFormat::Tiff)?,
        // The webp encoder only accepts three-channel input.
        ExportFormat::WebP => {
            RasterBuffer::from_rgb(buffer.to_rgb())?.encode(ImageFormat::WebP)?
        }
    };

    Ok(EncodedArtifact {
        bytes,
        media_type: format.media_type(),
        filename: format!("exported_image.{}", format.extension()),
    })
}

/// JPEG has no alpha; buffers are already alpha-free, so encoding is a
/// straight 1- or 3-channel write.
fn encode_jpeg(buffer: &RasterBuffer, quality: u8) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    match buffer {
        RasterBuffer::Gray(img) => encoder.encode(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::L8,
        ),
        RasterBuffer::Rgb(img) => encoder.encode(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgb8,
        ),
    }
    .map_err(|e| ProcessError::transform_failed("encode jpeg", e))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    fn source() -> RasterBuffer {
        RasterBuffer::from_rgb(RgbImage::from_fn(50, 40, |x, y| {
            Rgb([(x * 5) as u8, (y * 6) as u8, 200])
        }))
        .unwrap()
    }

    #[test]
    fn comparison_shape_holds_for_any_derived_buffer() {
        let src = source();
        let derived_small_gray =
            RasterBuffer::from_gray(GrayImage::from_pixel(13, 29, Luma([7]))).unwrap();
        let derived_large_rgb =
            RasterBuffer::from_rgb(RgbImage::from_pixel(200, 300, Rgb([1, 2, 3]))).unwrap();

        for derived in [derived_small_gray, derived_large_rgb] {
            let artifact = compare(&src, &derived, "grayscale").unwrap();
            assert_eq!(artifact.dimensions(), (100, 40 + LABEL_STRIP_HEIGHT));
            assert_eq!(artifact.channels(), 3);
        }
    }

    #[test]
    fn source_half_is_never_resized() {
        let src = source();
        let derived = RasterBuffer::from_gray(GrayImage::new(10, 10)).unwrap();
        let artifact = compare(&src, &derived, "threshold").unwrap();
        match artifact {
            RasterBuffer::Rgb(img) => {
                // Pixel (20, 10) of the source lands at (20, 10 + strip).
                assert_eq!(
                    img.get_pixel(20, 10 + LABEL_STRIP_HEIGHT).0,
                    [100, 60, 200]
                );
            }
            _ => panic!("expected rgb artifact"),
        }
    }

    #[test]
    fn label_strip_is_black_with_white_text() {
        let artifact = compare(&source(), &source(), "blur").unwrap();
        match artifact {
            RasterBuffer::Rgb(img) => {
                assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
                let white_in_strip = (0..img.width())
                    .flat_map(|x| (0..LABEL_STRIP_HEIGHT).map(move |y| (x, y)))
                    .filter(|&(x, y)| img.get_pixel(x, y).0 == [255, 255, 255])
                    .count();
                assert!(white_in_strip > 20, "white pixels: {}", white_in_strip);
            }
            _ => panic!("expected rgb artifact"),
        }
    }

    #[test]
    fn export_jpeg_flattens_alpha_sources() {
        let rgba = RgbaImage::from_pixel(8, 8, Rgba([120, 50, 30, 200]));
        let mut png = Cursor::new(Vec::new());
        rgba.write_to(&mut png, ImageFormat::Png).unwrap();
        let buffer = RasterBuffer::decode(&png.into_inner()).unwrap();

        let artifact = export(&buffer, "jpg", 90).unwrap();
        assert_eq!(artifact.media_type, "image/jpeg");
        let back = RasterBuffer::decode(&artifact.bytes).unwrap();
        assert_eq!(back.channels(), 3);
    }

    #[test]
    fn export_rejects_unknown_formats() {
        let err = export(&source(), "exe", 90).unwrap_err();
        assert!(matches!(err, ProcessError::UnsupportedFormat { .. }));
    }

    #[test]
    fn export_validates_quality_range() {
        assert!(export(&source(), "jpg", 0).is_err());
        assert!(export(&source(), "jpg", 100).is_ok());
    }

    #[test]
    fn export_png_round_trips() {
        let buffer = source();
        let artifact = export(&buffer, "png", 95).unwrap();
        assert_eq!(RasterBuffer::decode(&artifact.bytes).unwrap(), buffer);
    }

    #[test]
    fn export_pdf_produces_a_pdf_header() {
        let artifact = export(&source(), "pdf", 90).unwrap();
        assert_eq!(artifact.media_type, "application/pdf");
        assert_eq!(&artifact.bytes[0..5], b"%PDF-");
    }
}

//! Minimal single-page PDF container for image export.
//!
//! The document embeds one JPEG-encoded image as a full-page XObject.
//! Page geometry is explicit configuration: pixel dimensions are mapped
//! to points at a configured DPI, with an optional uniform margin.

use crate::core::{ProcessError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Page layout settings for PDF export.
#[derive(Debug, Clone)]
pub struct PdfSettings {
    /// Pixels per inch used to size the page from the image.
    pub dpi: f32,
    /// Uniform page margin in points.
    pub margin_pt: f32,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            dpi: 100.0,
            margin_pt: 0.0,
        }
    }
}

/// Builds a one-page document with the JPEG placed as a full-page embed.
///
/// `jpeg` must be a baseline JPEG stream (it is wrapped with the
/// `DCTDecode` filter, not re-encoded) of `width` x `height` pixels.
pub fn write_single_page(
    jpeg: &[u8],
    (width, height): (u32, u32),
    settings: &PdfSettings,
) -> Result<Vec<u8>> {
    // 72 points per inch.
    let image_w_pt = width as f32 * 72.0 / settings.dpi;
    let image_h_pt = height as f32 * 72.0 / settings.dpi;
    let page_w_pt = image_w_pt + 2.0 * settings.margin_pt;
    let page_h_pt = image_h_pt + 2.0 * settings.margin_pt;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg.to_vec(),
    );
    // Already DCT-compressed; the writer must not deflate it again.
    image_stream.allows_compression = false;
    let image_id = doc.add_object(image_stream);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    image_w_pt.into(),
                    0.into(),
                    0.into(),
                    image_h_pt.into(),
                    settings.margin_pt.into(),
                    settings.margin_pt.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content
        .encode()
        .map_err(|e| ProcessError::transform_failed("pdf content stream", e))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), page_w_pt.into(), page_h_pt.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| ProcessError::transform_failed("pdf save", e))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // A tiny but syntactically valid JPEG payload stand-in; the container
    // wraps the bytes verbatim.
    fn fake_jpeg() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend_from_slice(&[0u8; 32]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    #[test]
    fn document_has_pdf_header_and_single_page() {
        let out = write_single_page(&fake_jpeg(), (200, 100), &PdfSettings::default()).unwrap();
        assert_eq!(&out[0..5], b"%PDF-");
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("/Count 1"));
        assert!(text.contains("/DCTDecode"));
    }

    #[test]
    fn page_size_follows_dpi() {
        let settings = PdfSettings {
            dpi: 72.0,
            margin_pt: 0.0,
        };
        // At 72 dpi one pixel is one point, so the MediaBox matches the
        // pixel dimensions.
        let out = write_single_page(&fake_jpeg(), (300, 150), &settings).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("/MediaBox"));
        assert!(text.contains("300"));
        assert!(text.contains("150"));
    }

    #[test]
    fn margin_grows_the_page() {
        let settings = PdfSettings {
            dpi: 72.0,
            margin_pt: 36.0,
        };
        let out = write_single_page(&fake_jpeg(), (100, 100), &settings).unwrap();
        let text = String::from_utf8_lossy(&out);
        // 100 + 2 * 36 points per side.
        assert!(text.contains("172"));
    }
}

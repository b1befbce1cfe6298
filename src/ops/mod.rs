//! The operation registry: a fixed catalog mapping operation identifiers
//! plus parameter maps onto pure buffer transforms.
//!
//! Each entry is a deterministic, side-effect-free mapping
//! `(RasterBuffer, parameters) -> RasterBuffer`. Parameter maps are parsed
//! into schema-validated structs per operation before any pixel work:
//! unrecognized identifiers, unknown keys, wrong types, and out-of-range
//! values are all rejected up front.

pub mod arithmetic;
pub mod binary;
pub mod color;
pub mod draw;
pub mod filter;
pub mod geometry;
pub mod histogram;

pub use color::ColorSpace;
pub use draw::{draw_label, DrawShape};

use crate::buffer::RasterBuffer;
use crate::core::{validate_odd_kernel, ProcessError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Every operation identifier in the catalog, in request-surface order.
pub const OPERATION_NAMES: [&str; 11] = [
    "grayscale",
    "colorspace",
    "draw",
    "transform",
    "resize_crop",
    "arithmetic",
    "convolution",
    "threshold",
    "morph_edge",
    "histogram",
    "denoise",
];

/// Schema for operations that accept no parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyParams {}

/// Parameters for `colorspace`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorspaceParams {
    /// Target color space.
    pub space: ColorSpace,
}

/// Parameters for `draw`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DrawParams {
    /// Shape to render.
    pub shape: DrawShape,
    /// Text string, required when `shape` is `text`.
    #[serde(default)]
    pub text: Option<String>,
}

/// Parameters for `transform`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformParams {
    #[serde(default)]
    pub tx: i32,
    #[serde(default)]
    pub ty: i32,
    /// Rotation about center in degrees, positive counter-clockwise.
    #[serde(default)]
    pub angle: f32,
}

/// Parameters for `resize_crop`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeCropParams {
    #[serde(default = "default_resize_edge")]
    pub width: u32,
    #[serde(default = "default_resize_edge")]
    pub height: u32,
    /// Remove a fixed margin from each side after resizing.
    #[serde(default)]
    pub crop: bool,
}

fn default_resize_edge() -> u32 {
    100
}

/// Parameters for `arithmetic`. The operator is a free-form string:
/// unrecognized operators fall back to a no-op instead of failing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArithmeticParams {
    #[serde(default = "default_arithmetic_op")]
    pub op: String,
}

fn default_arithmetic_op() -> String {
    "add".to_string()
}

/// Operator selector for `convolution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvolutionOp {
    Blur,
    Sharpen,
}

/// Parameters for `convolution`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvolutionParams {
    #[serde(default = "default_convolution_op")]
    pub op: ConvolutionOp,
    /// Gaussian kernel edge length; must be a positive odd integer.
    #[serde(default = "default_blur_kernel")]
    pub kernel_size: u32,
}

fn default_convolution_op() -> ConvolutionOp {
    ConvolutionOp::Blur
}

fn default_blur_kernel() -> u32 {
    7
}

/// Operator selector for `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdOp {
    Binary,
    Adaptive,
}

/// Parameters for `threshold`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdParams {
    #[serde(default = "default_threshold_op")]
    pub op: ThresholdOp,
}

fn default_threshold_op() -> ThresholdOp {
    ThresholdOp::Binary
}

/// Operator selector for `morph_edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MorphEdgeOp {
    Dilate,
    Erode,
    Canny,
    Sobel,
}

/// Parameters for `morph_edge`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MorphEdgeParams {
    #[serde(default = "default_morph_edge_op")]
    pub op: MorphEdgeOp,
}

fn default_morph_edge_op() -> MorphEdgeOp {
    MorphEdgeOp::Canny
}

/// Operator selector for `histogram`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistogramOp {
    Equalize,
    Clahe,
}

/// Parameters for `histogram`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistogramParams {
    #[serde(default = "default_histogram_op")]
    pub op: HistogramOp,
}

fn default_histogram_op() -> HistogramOp {
    HistogramOp::Equalize
}

/// Operator selector for `denoise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenoiseOp {
    Bilateral,
    Gaussian,
    Median,
}

/// Parameters for `denoise`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DenoiseParams {
    #[serde(default = "default_denoise_op")]
    pub op: DenoiseOp,
    /// Window edge length for gaussian/median; positive odd.
    #[serde(default = "default_denoise_kernel")]
    pub kernel_size: u32,
    /// Neighborhood diameter for bilateral; positive odd.
    #[serde(default = "default_bilateral_diameter")]
    pub diameter: u32,
    #[serde(default = "default_bilateral_sigma")]
    pub sigma_color: f32,
    #[serde(default = "default_bilateral_sigma")]
    pub sigma_space: f32,
}

fn default_denoise_op() -> DenoiseOp {
    DenoiseOp::Bilateral
}

fn default_denoise_kernel() -> u32 {
    5
}

fn default_bilateral_diameter() -> u32 {
    9
}

fn default_bilateral_sigma() -> f32 {
    75.0
}

/// One fully validated registry entry, ready to run against a buffer.
#[derive(Debug, Clone)]
pub enum Operation {
    Grayscale,
    Colorspace(ColorspaceParams),
    Draw(DrawParams),
    Transform(TransformParams),
    ResizeCrop(ResizeCropParams),
    Arithmetic(ArithmeticParams),
    Convolution(ConvolutionParams),
    Threshold(ThresholdParams),
    MorphEdge(MorphEdgeParams),
    Histogram(HistogramParams),
    Denoise(DenoiseParams),
}

impl Operation {
    /// Resolves an identifier and parameter map into a validated entry.
    ///
    /// Unknown identifiers fail with `UnknownOperation` before any buffer
    /// work; schema violations fail with `InvalidParameter`.
    pub fn parse(name: &str, params: &Value) -> Result<Self> {
        let op = match name {
            "grayscale" => {
                parse_params::<EmptyParams>(name, params)?;
                Operation::Grayscale
            }
            "colorspace" => Operation::Colorspace(parse_params(name, params)?),
            "draw" => Operation::Draw(parse_params(name, params)?),
            "transform" => Operation::Transform(parse_params(name, params)?),
            "resize_crop" => Operation::ResizeCrop(parse_params(name, params)?),
            "arithmetic" => Operation::Arithmetic(parse_params(name, params)?),
            "convolution" => Operation::Convolution(parse_params(name, params)?),
            "threshold" => Operation::Threshold(parse_params(name, params)?),
            "morph_edge" => Operation::MorphEdge(parse_params(name, params)?),
            "histogram" => Operation::Histogram(parse_params(name, params)?),
            "denoise" => Operation::Denoise(parse_params(name, params)?),
            other => {
                return Err(ProcessError::UnknownOperation {
                    name: other.to_string(),
                })
            }
        };
        op.validate()?;
        Ok(op)
    }

    /// The catalog identifier of this entry.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Grayscale => "grayscale",
            Operation::Colorspace(_) => "colorspace",
            Operation::Draw(_) => "draw",
            Operation::Transform(_) => "transform",
            Operation::ResizeCrop(_) => "resize_crop",
            Operation::Arithmetic(_) => "arithmetic",
            Operation::Convolution(_) => "convolution",
            Operation::Threshold(_) => "threshold",
            Operation::MorphEdge(_) => "morph_edge",
            Operation::Histogram(_) => "histogram",
            Operation::Denoise(_) => "denoise",
        }
    }

    /// Range and cross-field checks that serde cannot express.
    fn validate(&self) -> Result<()> {
        match self {
            Operation::ResizeCrop(p) => {
                if p.width == 0 || p.height == 0 {
                    return Err(ProcessError::invalid_parameter(format!(
                        "resize target must be at least 1x1, got {}x{}",
                        p.width, p.height
                    )));
                }
                if p.crop && (p.width <= 2 * geometry::CROP_MARGIN || p.height <= 2 * geometry::CROP_MARGIN)
                {
                    return Err(ProcessError::invalid_parameter(format!(
                        "crop requires both target dimensions above {}, got {}x{}",
                        2 * geometry::CROP_MARGIN,
                        p.width,
                        p.height
                    )));
                }
                Ok(())
            }
            Operation::Draw(p) => {
                if p.shape == DrawShape::Text && p.text.as_deref().unwrap_or("").is_empty() {
                    return Err(ProcessError::missing_field(
                        "text",
                        "draw operation with shape 'text'",
                    ));
                }
                Ok(())
            }
            Operation::Convolution(p) => validate_odd_kernel(p.kernel_size, "kernel_size"),
            Operation::Denoise(p) => match p.op {
                DenoiseOp::Bilateral => validate_odd_kernel(p.diameter, "diameter"),
                DenoiseOp::Gaussian | DenoiseOp::Median => {
                    validate_odd_kernel(p.kernel_size, "kernel_size")
                }
            },
            _ => Ok(()),
        }
    }

    /// Runs the transform. The input buffer is never mutated.
    pub fn apply(&self, buffer: &RasterBuffer) -> Result<RasterBuffer> {
        match self {
            Operation::Grayscale => color::grayscale(buffer),
            Operation::Colorspace(p) => color::colorspace(buffer, p.space),
            Operation::Draw(p) => draw::draw(buffer, p.shape, p.text.as_deref()),
            Operation::Transform(p) => geometry::transform(buffer, p.tx, p.ty, p.angle),
            Operation::ResizeCrop(p) => geometry::resize_crop(buffer, p.width, p.height, p.crop),
            Operation::Arithmetic(p) => arithmetic::arithmetic(buffer, &p.op),
            Operation::Convolution(p) => match p.op {
                ConvolutionOp::Blur => filter::blur(buffer, p.kernel_size),
                ConvolutionOp::Sharpen => filter::sharpen(buffer),
            },
            Operation::Threshold(p) => match p.op {
                ThresholdOp::Binary => binary::threshold_binary(buffer),
                ThresholdOp::Adaptive => binary::threshold_adaptive(buffer),
            },
            Operation::MorphEdge(p) => match p.op {
                MorphEdgeOp::Dilate => binary::dilate(buffer),
                MorphEdgeOp::Erode => binary::erode(buffer),
                MorphEdgeOp::Canny => binary::edges_canny(buffer),
                MorphEdgeOp::Sobel => binary::edges_sobel(buffer),
            },
            Operation::Histogram(p) => match p.op {
                HistogramOp::Equalize => histogram::equalize(buffer),
                HistogramOp::Clahe => histogram::clahe(buffer),
            },
            Operation::Denoise(p) => match p.op {
                DenoiseOp::Bilateral => {
                    filter::bilateral(buffer, p.diameter, p.sigma_color, p.sigma_space)
                }
                DenoiseOp::Gaussian => filter::blur(buffer, p.kernel_size),
                DenoiseOp::Median => filter::median(buffer, p.kernel_size),
            },
        }
    }
}

fn parse_params<P: for<'de> Deserialize<'de>>(name: &str, params: &Value) -> Result<P> {
    let value = match params {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(value)
        .map_err(|e| ProcessError::invalid_parameter(format!("{}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use serde_json::json;

    fn buffer() -> RasterBuffer {
        RasterBuffer::from_rgb(RgbImage::from_fn(30, 30, |x, y| {
            Rgb([(x * 8) as u8, (y * 8) as u8, 128])
        }))
        .unwrap()
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let err = Operation::parse("foo", &json!({})).unwrap_err();
        assert!(matches!(err, ProcessError::UnknownOperation { name } if name == "foo"));
    }

    #[test]
    fn every_catalog_name_parses_with_defaults() {
        for name in OPERATION_NAMES {
            // colorspace and draw have required fields.
            let params = match name {
                "colorspace" => json!({"space": "HSV"}),
                "draw" => json!({"shape": "rectangle"}),
                _ => json!({}),
            };
            let op = Operation::parse(name, &params).unwrap();
            assert_eq!(op.name(), name);
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Operation::parse("grayscale", &json!({"bogus": 1})).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidParameter { .. }));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = Operation::parse("transform", &json!({"tx": "left"})).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidParameter { .. }));
    }

    #[test]
    fn even_kernel_sizes_are_rejected() {
        let err =
            Operation::parse("convolution", &json!({"op": "blur", "kernel_size": 4})).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidParameter { .. }));

        let err =
            Operation::parse("denoise", &json!({"op": "median", "kernel_size": 6})).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidParameter { .. }));
    }

    #[test]
    fn crop_bounds_are_checked_at_parse_time() {
        let err = Operation::parse(
            "resize_crop",
            &json!({"width": 20, "height": 100, "crop": true}),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidParameter { .. }));
    }

    #[test]
    fn draw_text_requires_text() {
        let err = Operation::parse("draw", &json!({"shape": "text"})).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidParameter { .. }));
    }

    #[test]
    fn null_params_mean_defaults() {
        let op = Operation::parse("threshold", &Value::Null).unwrap();
        let out = op.apply(&buffer()).unwrap();
        assert_eq!(out.channels(), 1);
    }

    #[test]
    fn apply_is_deterministic() {
        let op = Operation::parse("convolution", &json!({"op": "blur"})).unwrap();
        let input = buffer();
        let a = op.apply(&input).unwrap().encode_png().unwrap();
        let b = op.apply(&input).unwrap().encode_png().unwrap();
        assert_eq!(a, b);
    }
}

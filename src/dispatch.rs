//! The dispatcher: resolves an operation identifier plus parameter map to
//! a registry entry, validates it, and invokes the transform.
//!
//! Identifier resolution and parameter validation happen before any pixel
//! work; failures inside the transform itself keep their original cause
//! attached. The input buffer is never mutated (destructive operations
//! work on a copy taken inside the registry).

use crate::buffer::RasterBuffer;
use crate::core::Result;
use crate::ops::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One requested transform: identifier plus parameter map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Operation identifier (a key in the registry catalog).
    #[serde(alias = "operation")]
    pub name: String,
    /// Parameter object; absent means all defaults.
    #[serde(default)]
    pub params: Value,
}

impl OperationDescriptor {
    /// Builds a descriptor from an identifier and a parameter value.
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Resolves, validates, and runs one operation against a buffer.
///
/// # Errors
///
/// * `UnknownOperation` if the identifier is not in the registry.
/// * `InvalidParameter` if the parameter map violates the operation schema.
/// * `TransformFailed` if the transform raises during execution.
pub fn dispatch(name: &str, params: &Value, buffer: &RasterBuffer) -> Result<RasterBuffer> {
    let operation = Operation::parse(name, params)?;
    debug!(
        operation = operation.name(),
        width = buffer.width(),
        height = buffer.height(),
        channels = buffer.channels(),
        "dispatching operation"
    );
    operation.apply(buffer)
}

/// Convenience wrapper for callers holding a descriptor.
pub fn dispatch_descriptor(
    descriptor: &OperationDescriptor,
    buffer: &RasterBuffer,
) -> Result<RasterBuffer> {
    dispatch(&descriptor.name, &descriptor.params, buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProcessError;
    use image::{Rgb, RgbImage};
    use serde_json::json;

    fn buffer() -> RasterBuffer {
        RasterBuffer::from_rgb(RgbImage::from_fn(100, 100, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        }))
        .unwrap()
    }

    #[test]
    fn unknown_operation_does_no_buffer_work() {
        let err = dispatch("foo", &json!({}), &buffer()).unwrap_err();
        assert!(matches!(err, ProcessError::UnknownOperation { .. }));
    }

    #[test]
    fn grayscale_applied_twice_equals_once() {
        let input = buffer();
        let once = dispatch("grayscale", &json!({}), &input).unwrap();
        let twice = dispatch("grayscale", &json!({}), &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn grayscale_shape_contract() {
        let out = dispatch("grayscale", &json!({}), &buffer()).unwrap();
        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(out.channels(), 1);
    }

    #[test]
    fn geometric_transform_preserves_dimensions() {
        let out = dispatch("transform", &json!({"tx": 9, "ty": -4, "angle": 45.0}), &buffer())
            .unwrap();
        assert_eq!(out.dimensions(), (100, 100));
    }

    #[test]
    fn resize_crop_scenario_produces_80x80() {
        let out = dispatch(
            "resize_crop",
            &json!({"width": 100, "height": 100, "crop": true}),
            &buffer(),
        )
        .unwrap();
        assert_eq!(out.dimensions(), (80, 80));
    }

    #[test]
    fn dispatch_never_mutates_its_input() {
        let input = buffer();
        let before = input.clone();
        dispatch("draw", &json!({"shape": "circle"}), &input).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn identical_calls_yield_byte_identical_output() {
        let input = buffer();
        let params = json!({"op": "clahe"});
        let a = dispatch("histogram", &params, &input).unwrap().encode_png().unwrap();
        let b = dispatch("histogram", &params, &input).unwrap().encode_png().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn descriptor_round_trips_through_json() {
        let descriptor: OperationDescriptor =
            serde_json::from_value(json!({"name": "threshold", "params": {"op": "adaptive"}}))
                .unwrap();
        let out = dispatch_descriptor(&descriptor, &buffer()).unwrap();
        assert_eq!(out.channels(), 1);
    }
}

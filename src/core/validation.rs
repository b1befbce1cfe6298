//! Parameter validation helpers shared by the operation schemas.
//!
//! Validation happens before a transform touches any pixels, so every
//! failure here surfaces as `InvalidParameter` with the field name attached.

use super::errors::{ProcessError, Result};

/// Validates that a value is strictly positive.
pub fn validate_positive(value: i64, field: &str) -> Result<()> {
    if value <= 0 {
        return Err(ProcessError::invalid_field(
            field,
            "a positive integer",
            value,
        ));
    }
    Ok(())
}

/// Validates that a kernel or window size is a positive odd integer.
///
/// Filtering operations require odd sizes so the kernel has a well-defined
/// center; non-conforming values fail rather than being silently rounded.
pub fn validate_odd_kernel(value: u32, field: &str) -> Result<()> {
    if value == 0 || value % 2 == 0 {
        return Err(ProcessError::invalid_field(
            field,
            "a positive odd integer",
            value,
        ));
    }
    Ok(())
}

/// Validates that an image has non-zero area.
pub fn validate_image_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ProcessError::invalid_parameter(format!(
            "image dimensions must be non-zero, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

/// Validates that a value lies within an inclusive range.
pub fn validate_range(value: i64, min: i64, max: i64, field: &str) -> Result<()> {
    if value < min || value > max {
        return Err(ProcessError::invalid_field(
            field,
            format!("a value in {}..={}", min, max),
            value,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_kernel_accepts_odd_rejects_even_and_zero() {
        assert!(validate_odd_kernel(1, "k").is_ok());
        assert!(validate_odd_kernel(7, "k").is_ok());
        assert!(validate_odd_kernel(0, "k").is_err());
        assert!(validate_odd_kernel(4, "k").is_err());
    }

    #[test]
    fn dimensions_must_be_non_zero() {
        assert!(validate_image_dimensions(1, 1).is_ok());
        assert!(validate_image_dimensions(0, 10).is_err());
        assert!(validate_image_dimensions(10, 0).is_err());
    }

    #[test]
    fn range_is_inclusive() {
        assert!(validate_range(1, 1, 100, "quality").is_ok());
        assert!(validate_range(100, 1, 100, "quality").is_ok());
        assert!(validate_range(0, 1, 100, "quality").is_err());
        assert!(validate_range(101, 1, 100, "quality").is_err());
    }
}

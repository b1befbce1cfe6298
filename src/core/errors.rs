//! Core error types for the transformation pipeline.
//!
//! This module defines the error taxonomy used throughout the system. The
//! variants map directly onto user-visible failure classes: bad identifiers
//! and parameters are client errors, transform execution failures are
//! internal errors with the original cause preserved for diagnostics.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Errors raised by the dispatch, batch, and rendering layers.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The operation identifier is not present in the registry.
    ///
    /// Raised before any buffer work begins.
    #[error("unknown operation '{name}'")]
    UnknownOperation {
        /// The identifier that failed to resolve.
        name: String,
    },

    /// A parameter is missing, has the wrong type, or is out of range.
    #[error("invalid parameter: {message}")]
    InvalidParameter {
        /// A message describing the offending parameter.
        message: String,
    },

    /// An operation failed while executing against a buffer.
    #[error("transform failed: {context}")]
    TransformFailed {
        /// Which transform or stage was running.
        context: String,
        /// The underlying error that caused this failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A batch request exceeded the item ceiling. No partial work is done.
    #[error("batch of {count} items exceeds the limit of {limit}")]
    BatchTooLarge {
        /// Number of items submitted.
        count: usize,
        /// The fixed ceiling.
        limit: usize,
    },

    /// The requested export target cannot be encoded.
    #[error("unsupported export format '{format}'")]
    UnsupportedFormat {
        /// The format string as supplied by the caller.
        format: String,
    },

    /// Error occurred while decoding an uploaded image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for ProcessError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl ProcessError {
    /// Creates an `InvalidParameter` error from a plain message.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates an `InvalidParameter` error for a field whose value does not
    /// match what the operation's schema expects.
    pub fn invalid_field(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidParameter {
            message: format!(
                "invalid value for field '{}': expected {}, got {}",
                field.into(),
                expected.into(),
                actual
            ),
        }
    }

    /// Creates an `InvalidParameter` error for a missing required field.
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: format!(
                "missing required field '{}' in {}",
                field.into(),
                context.into()
            ),
        }
    }

    /// Wraps an error raised during transform execution, attaching context
    /// about which operation was running.
    pub fn transform_failed(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::TransformFailed {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Returns true when the error is caused by user input rather than an
    /// internal failure. The HTTP layer maps these to 4xx responses.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperation { .. }
                | Self::InvalidParameter { .. }
                | Self::BatchTooLarge { .. }
                | Self::UnsupportedFormat { .. }
                | Self::ImageLoad(_)
        )
    }
}

//! The report builder: structured metadata describing which operations
//! were requested against which source.
//!
//! Purely descriptive. The operation list is carried verbatim and its
//! entries are not checked against the registry: the report documents
//! requested intent, not executed transforms.

use crate::core::{ProcessError, Result};
use chrono::Local;
use serde::Serialize;
use serde_json::Value;

/// Fallback source identity when the caller supplied no file name.
const UNNAMED_SOURCE: &str = "Uploaded Image";

/// Metadata describing one processing request.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingReport {
    /// Local wall-clock time the report was built.
    pub timestamp: String,
    /// Source identity as supplied by the caller.
    pub original_filename: String,
    /// Source dimensions rendered as `"W x H"`.
    pub original_dimensions: String,
    /// Number of entries in `operations`.
    pub operations_applied: usize,
    /// The caller's operation list, verbatim.
    pub operations: Value,
}

/// Assembles a report from the request description.
///
/// # Errors
///
/// Returns `InvalidParameter` if `operations` is not a JSON array; beyond
/// that structural check the list is passed through untouched.
pub fn build_report(
    source_name: Option<&str>,
    dimensions: (u32, u32),
    operations: Value,
) -> Result<ProcessingReport> {
    let count = match &operations {
        Value::Array(entries) => entries.len(),
        other => {
            return Err(ProcessError::invalid_parameter(format!(
                "operations must be a JSON array, got {}",
                json_type_name(other)
            )))
        }
    };

    Ok(ProcessingReport {
        timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        original_filename: source_name
            .filter(|name| !name.is_empty())
            .unwrap_or(UNNAMED_SOURCE)
            .to_string(),
        original_dimensions: format!("{} x {}", dimensions.0, dimensions.1),
        operations_applied: count,
        operations,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

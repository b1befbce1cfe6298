//! CLI mode: apply one operation to a local file.

use rasterlab::{dispatch, render, RasterBuffer};
use std::path::Path;
use tracing::info;

/// Reads `input`, applies `operation`, and writes the result to `output`
/// in the container implied by the output extension.
pub fn apply(
    input: &Path,
    output: &Path,
    operation: &str,
    params: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let bytes = std::fs::read(input)?;
    let buffer = RasterBuffer::decode(&bytes)?;
    let params: serde_json::Value = serde_json::from_str(params)
        .map_err(|e| format!("--params is not valid JSON: {}", e))?;

    let result = dispatch::dispatch(operation, &params, &buffer)?;

    let format = output
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("png");
    let artifact = render::export(&result, format, 95)?;
    std::fs::write(output, &artifact.bytes)?;

    info!(
        operation = operation,
        input = %input.display(),
        output = %output.display(),
        width = result.width(),
        height = result.height(),
        "operation applied"
    );
    Ok(())
}

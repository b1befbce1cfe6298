//! The batch orchestrator: one operation applied across a set of images
//! with isolated per-item failure and archive packaging.
//!
//! A batch call always completes with a per-item outcome vector; this is
//! the one place in the system where errors are intentionally absorbed.
//! The item ceiling and the operation identifier/parameters are checked
//! before any pixel work, so those failures produce no partial results.

use crate::buffer::RasterBuffer;
use crate::core::{ProcessError, Result};
use crate::ops::Operation;
use rayon::prelude::*;
use serde_json::Value;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Fixed ceiling on items per batch call.
pub const MAX_BATCH_ITEMS: usize = 10;

/// One named input: raw encoded bytes, decoded inside the per-item
/// isolation boundary.
#[derive(Debug, Clone)]
pub struct BatchInput {
    /// Source file name as supplied by the caller, if any.
    pub name: Option<String>,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
}

/// Outcome of one batch item.
#[derive(Debug)]
pub enum BatchOutcome {
    /// The item was transformed and encoded.
    Success {
        /// Deterministic output name inside the archive.
        filename: String,
        /// PNG-encoded result.
        bytes: Vec<u8>,
    },
    /// The item failed to decode or transform.
    Failure {
        /// Human-readable error detail.
        error: String,
    },
}

/// Per-input result, ordered by original input position.
#[derive(Debug)]
pub struct BatchItemResult {
    /// Zero-based input position.
    pub index: usize,
    /// Source name as supplied.
    pub source_name: Option<String>,
    /// Success or failure outcome.
    pub outcome: BatchOutcome,
}

impl BatchItemResult {
    /// True when the item produced encoded output.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success { .. })
    }
}

/// The result of one batch call: outcome vector plus packaged archive.
#[derive(Debug)]
pub struct BatchReport {
    /// Identifier minted for this batch; the external layer may store the
    /// archive under it for later retrieval.
    pub batch_id: String,
    /// Per-item outcomes in input order.
    pub results: Vec<BatchItemResult>,
    /// Number of successfully transformed items.
    pub success_count: usize,
    /// Zip archive containing exactly the successful items, input order.
    pub archive: Vec<u8>,
}

impl BatchReport {
    /// Total number of items processed.
    pub fn processed(&self) -> usize {
        self.results.len()
    }
}

/// Applies one operation to every input and packages the successes.
///
/// Items are processed concurrently; the outcome vector is ordered by
/// input position regardless of completion order. A single item's decode
/// or transform failure is recorded and does not abort the rest.
///
/// # Errors
///
/// * `BatchTooLarge` if more than `max_items` inputs are supplied; no
///   partial work is performed.
/// * `UnknownOperation` / `InvalidParameter` if the operation itself is
///   invalid; checked before any item is touched.
pub fn run_batch(
    operation_name: &str,
    params: &Value,
    inputs: Vec<BatchInput>,
    max_items: usize,
) -> Result<BatchReport> {
    if inputs.len() > max_items {
        return Err(ProcessError::BatchTooLarge {
            count: inputs.len(),
            limit: max_items,
        });
    }
    let operation = Operation::parse(operation_name, params)?;

    let results: Vec<BatchItemResult> = inputs
        .into_par_iter()
        .enumerate()
        .map(|(index, input)| process_item(&operation, index, input))
        .collect();

    for result in results.iter().filter(|r| !r.is_success()) {
        if let BatchOutcome::Failure { error } = &result.outcome {
            warn!(index = result.index, error = %error, "batch item failed");
        }
    }

    let archive = build_archive(&results)?;
    let success_count = results.iter().filter(|r| r.is_success()).count();
    let batch_id = uuid::Uuid::new_v4().to_string();

    info!(
        batch_id = %batch_id,
        processed = results.len(),
        succeeded = success_count,
        "batch complete"
    );

    Ok(BatchReport {
        batch_id,
        results,
        success_count,
        archive,
    })
}

/// Decode, transform, and encode one item. Every failure is converted to
/// a failure outcome here; nothing propagates out.
fn process_item(operation: &Operation, index: usize, input: BatchInput) -> BatchItemResult {
    let filename = output_filename(index, input.name.as_deref());
    let outcome = RasterBuffer::decode(&input.bytes)
        .and_then(|buffer| operation.apply(&buffer))
        .and_then(|out| out.encode_png())
        .map(|bytes| BatchOutcome::Success {
            filename,
            bytes,
        })
        .unwrap_or_else(|e| BatchOutcome::Failure {
            error: e.to_string(),
        });

    BatchItemResult {
        index,
        source_name: input.name,
        outcome,
    }
}

/// Deterministic archive name: 1-based position plus the source stem.
fn output_filename(index: usize, source_name: Option<&str>) -> String {
    let stem = source_name
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("image");
    format!("processed_{}_{}.png", index + 1, stem)
}

/// Packages the successful items into one zip, preserving input order.
fn build_archive(results: &[BatchItemResult]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for result in results {
        if let BatchOutcome::Success { filename, bytes } = &result.outcome {
            writer
                .start_file(filename.clone(), options)
                .map_err(|e| ProcessError::transform_failed("batch archive", e))?;
            writer.write_all(bytes)?;
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| ProcessError::transform_failed("batch archive", e))?;
    Ok(cursor.into_inner())
}

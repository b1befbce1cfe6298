//! # rasterlab
//!
//! A catalog of raster-image transformations behind uniform
//! request/response contracts, with two higher-order capabilities built on
//! top: batch application of one operation across a set of images (with
//! archive packaging and per-item failure isolation) and side-by-side
//! comparison rendering that reconciles differing color depths and
//! dimensions.
//!
//! The crate is organized leaves-first:
//!
//! - [`buffer`]: the decoded raster image shared by everything below
//! - [`ops`]: the operation registry of pure buffer transforms
//! - [`dispatch`]: identifier resolution, parameter validation, invocation
//! - [`batch`]: the batch orchestrator with partial-failure semantics
//! - [`render`]: comparison composition and multi-format export
//! - [`report`]: structured request metadata
//!
//! Every invocation is request-scoped: buffers are owned exclusively for
//! the duration of a call, operations never mutate their inputs, and no
//! state is shared across calls.
//!
//! ## Example
//!
//! ```no_run
//! use rasterlab::{dispatch, RasterBuffer};
//! use serde_json::json;
//!
//! # fn main() -> rasterlab::Result<()> {
//! let buffer = RasterBuffer::decode(&std::fs::read("photo.png")?)?;
//! let edges = dispatch::dispatch("morph_edge", &json!({"op": "canny"}), &buffer)?;
//! std::fs::write("edges.png", edges.encode_png()?)?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod buffer;
pub mod core;
pub mod dispatch;
pub mod ops;
pub mod pdf;
pub mod render;
pub mod report;
pub mod utils;

pub use buffer::RasterBuffer;
pub use core::{ProcessError, Result};
pub use dispatch::{dispatch_descriptor, OperationDescriptor};
pub use ops::{Operation, OPERATION_NAMES};

// Most callers want the free functions under their module names
// (`dispatch::dispatch`, `batch::run_batch`, `render::compare`).

//! Route handlers: multipart upload parsing, parameter coercion, and
//! response shaping around the core dispatch/batch/render calls.

use crate::server::SharedState;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use base64::Engine;
use rasterlab::batch::{run_batch, BatchInput, BatchOutcome, MAX_BATCH_ITEMS};
use rasterlab::core::ProcessError;
use rasterlab::{dispatch, render, report, RasterBuffer};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Instant;
use tracing::{error, info};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// Error wrapper mapping the core taxonomy onto HTTP status codes.
pub struct ApiError(ProcessError);

impl From<ProcessError> for ApiError {
    fn from(error: ProcessError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_user_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error!(error = %self.0, "request failed");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// A parsed multipart request: uploaded files in arrival order plus the
/// plain form fields.
struct UploadForm {
    files: Vec<(Option<String>, Vec<u8>)>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut files = Vec::new();
        let mut fields = HashMap::new();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().map(str::to_string);
            let file_name = field.file_name().map(str::to_string);
            let is_file = file_name.is_some() || matches!(name.as_deref(), Some("file" | "files"));
            if is_file {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                files.push((file_name, bytes.to_vec()));
            } else if let Some(name) = name {
                let text = field.text().await.map_err(multipart_error)?;
                fields.insert(name, text);
            }
        }

        Ok(Self { files, fields })
    }

    /// The single uploaded file, for endpoints that take exactly one.
    fn file(&self) -> Result<(Option<&str>, &[u8]), ApiError> {
        self.files
            .first()
            .map(|(name, bytes)| (name.as_deref(), bytes.as_slice()))
            .ok_or_else(|| {
                ApiError(ProcessError::missing_field("file", "multipart upload"))
            })
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn require_field(&self, name: &str) -> Result<&str, ApiError> {
        self.field(name)
            .ok_or_else(|| ApiError(ProcessError::missing_field(name, "form data")))
    }

    /// Parses a form field into `T`, falling back to `default` when the
    /// field is absent.
    fn parsed<T: FromStr>(&self, name: &str, default: T) -> Result<T, ApiError>
    where
        T::Err: std::fmt::Display,
    {
        match self.fields.get(name) {
            Some(raw) => raw.trim().parse().map_err(|e| {
                ApiError(ProcessError::invalid_field(
                    name,
                    std::any::type_name::<T>(),
                    format!("'{}' ({})", raw, e),
                ))
            }),
            None => Ok(default),
        }
    }

    fn parsed_bool(&self, name: &str, default: bool) -> Result<bool, ApiError> {
        match self.fields.get(name) {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(true),
                "false" | "0" | "off" | "no" | "" => Ok(false),
                other => Err(ApiError(ProcessError::invalid_field(
                    name,
                    "a boolean",
                    other,
                ))),
            },
            None => Ok(default),
        }
    }

    /// Parses a JSON-encoded parameter object field; absent means `{}`.
    fn json_params(&self, name: &str) -> Result<Value, ApiError> {
        match self.field(name) {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw).map_err(|e| {
                ApiError(ProcessError::invalid_parameter(format!(
                    "{} is not valid JSON: {}",
                    name, e
                )))
            }),
            _ => Ok(json!({})),
        }
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError(ProcessError::invalid_parameter(format!(
        "malformed multipart body: {}",
        e
    )))
}

fn png_response(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}

/// Decode the form's upload, run one operation, and answer with PNG bytes.
fn apply_and_respond(name: &str, params: Value, form: &UploadForm) -> Result<Response, ApiError> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let start = Instant::now();

    let (_, bytes) = form.file()?;
    let buffer = RasterBuffer::decode(bytes)?;
    let result = dispatch::dispatch(name, &params, &buffer)?;

    info!(
        request_id = %request_id,
        operation = name,
        width = result.width(),
        height = result.height(),
        total_ms = start.elapsed().as_secs_f64() * 1000.0,
        "operation complete"
    );
    Ok(png_response(result.encode_png()?))
}

/// Builds `{"op": ...}` params from the form's `op` field when present.
fn op_params(form: &UploadForm) -> Value {
    match form.field("op") {
        Some(op) => json!({ "op": op }),
        None => json!({}),
    }
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Echo the decoded upload as PNG, reporting dimensions in headers.
pub async fn upload(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let (_, bytes) = form.file()?;
    let buffer = RasterBuffer::decode(bytes)?;
    let (width, height) = buffer.dimensions();

    let mut response = png_response(buffer.encode_png()?);
    let headers = response.headers_mut();
    headers.insert(HeaderName::from_static("x-image-width"), HeaderValue::from(width));
    headers.insert(HeaderName::from_static("x-image-height"), HeaderValue::from(height));
    Ok(response)
}

pub async fn grayscale(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    apply_and_respond("grayscale", json!({}), &form)
}

pub async fn colorspace(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let space = form.require_field("space")?.to_string();
    apply_and_respond("colorspace", json!({ "space": space }), &form)
}

pub async fn draw(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let shape = form.require_field("shape")?.to_string();
    let mut params = json!({ "shape": shape });
    if let Some(text) = form.field("text") {
        params["text"] = json!(text);
    }
    apply_and_respond("draw", params, &form)
}

pub async fn transform(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let tx: i32 = form.parsed("tx", 0)?;
    let ty: i32 = form.parsed("ty", 0)?;
    let angle: f32 = form.parsed("angle", 0.0)?;
    apply_and_respond("transform", json!({ "tx": tx, "ty": ty, "angle": angle }), &form)
}

pub async fn resize_crop(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let width: u32 = form.parsed("width", 100)?;
    let height: u32 = form.parsed("height", 100)?;
    let crop = form.parsed_bool("crop", false)?;
    apply_and_respond(
        "resize_crop",
        json!({ "width": width, "height": height, "crop": crop }),
        &form,
    )
}

pub async fn arithmetic(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let params = op_params(&form);
    apply_and_respond("arithmetic", params, &form)
}

pub async fn convolution(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let params = op_params(&form);
    apply_and_respond("convolution", params, &form)
}

pub async fn threshold(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let params = op_params(&form);
    apply_and_respond("threshold", params, &form)
}

pub async fn morph_edge(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let params = op_params(&form);
    apply_and_respond("morph_edge", params, &form)
}

pub async fn histogram(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let params = op_params(&form);
    apply_and_respond("histogram", params, &form)
}

pub async fn denoise(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let params = op_params(&form);
    apply_and_respond("denoise", params, &form)
}

/// Apply one operation across all uploaded files. Always answers 200 with
/// a per-item outcome vector; only whole-call failures (ceiling, invalid
/// operation) produce an error status.
pub async fn batch_process(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let operation = form.require_field("operation")?.to_string();
    let params = form.json_params("params")?;

    let inputs: Vec<BatchInput> = form
        .files
        .iter()
        .map(|(name, bytes)| BatchInput {
            name: name.clone(),
            bytes: bytes.clone(),
        })
        .collect();

    let batch = run_batch(&operation, &params, inputs, MAX_BATCH_ITEMS)?;

    state
        .archives
        .lock()
        .expect("archive store lock poisoned")
        .insert(batch.batch_id.clone(), batch.archive.clone());

    let results: Vec<Value> = batch
        .results
        .iter()
        .map(|item| match &item.outcome {
            BatchOutcome::Success { filename, bytes } => json!({
                "success": true,
                "filename": filename,
                "original_filename": item.source_name,
                "image_data": base64::engine::general_purpose::STANDARD.encode(bytes),
            }),
            BatchOutcome::Failure { error } => json!({
                "success": false,
                "original_filename": item.source_name,
                "error": error,
            }),
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "batch_id": batch.batch_id,
        "processed_count": batch.processed(),
        "success_count": batch.success_count,
        "results": results,
        "download_available": batch.success_count > 0,
    }))
    .into_response())
}

/// Serve a previously built batch archive by its minted identifier.
pub async fn download_batch(
    State(state): State<SharedState>,
    Path(batch_id): Path<String>,
) -> Response {
    let archive = state
        .archives
        .lock()
        .expect("archive store lock poisoned")
        .get(&batch_id)
        .cloned();

    match archive {
        Some(bytes) => (
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=batch_processed_{}.zip", batch_id),
                ),
            ],
            bytes,
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Batch file not found" })),
        )
            .into_response(),
    }
}

/// Side-by-side comparison of the upload and its transformed result.
pub async fn compare(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let operation = form.require_field("operation")?.to_string();
    let params = form.json_params("params")?;

    let (_, bytes) = form.file()?;
    let source = RasterBuffer::decode(bytes)?;
    let derived = dispatch::dispatch(&operation, &params, &source)?;
    let artifact = render::compare(&source, &derived, &operation)?;

    Ok(png_response(artifact.encode_png()?))
}

/// Re-encode the upload into the requested container.
pub async fn export(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let format = form.field("format").unwrap_or("png").to_string();
    let quality: u8 = form.parsed("quality", 95)?;

    let (_, bytes) = form.file()?;
    let buffer = RasterBuffer::decode(bytes)?;
    let artifact = render::export(&buffer, &format, quality)?;

    Ok((
        [
            (header::CONTENT_TYPE, artifact.media_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", artifact.filename),
            ),
        ],
        artifact.bytes,
    )
        .into_response())
}

/// Structured metadata about the requested operations.
pub async fn create_report(multipart: Multipart) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let raw = form.require_field("operations")?;
    let operations: Value = serde_json::from_str(raw).map_err(|e| {
        ApiError(ProcessError::invalid_parameter(format!(
            "operations is not valid JSON: {}",
            e
        )))
    })?;

    let (file_name, bytes) = form.file()?;
    let buffer = RasterBuffer::decode(bytes)?;
    let built = report::build_report(file_name, buffer.dimensions(), operations)?;

    Ok(Json(built).into_response())
}

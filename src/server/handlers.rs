//! HTTP request handlers

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::error::LuminaError;
use crate::table::Record;
use crate::utils::data_loader::TableFormat;

use super::error::{Result, ServerError};
use super::state::AppState;

/// File received through a multipart form
struct Upload {
    file_name: String,
    format: TableFormat,
    data: Bytes,
    target: Option<String>,
}

/// Reduce a client-supplied file name to a safe base name
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

async fn receive_upload(mut multipart: Multipart) -> Result<Upload> {
    let mut file = None;
    let mut target = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| ServerError::BadRequest(e.to_string()))? {
        match field.name() {
            Some("file") => {
                let file_name = sanitize_file_name(field.file_name().unwrap_or_default());
                let data = field.bytes().await.map_err(|e| ServerError::BadRequest(e.to_string()))?;
                file = Some((file_name, data));
            }
            Some("target") => {
                let text = field.text().await.map_err(|e| ServerError::BadRequest(e.to_string()))?;
                let text = text.trim();
                if !text.is_empty() {
                    target = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    let (file_name, data) = file.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    if data.is_empty() {
        return Err(ServerError::BadRequest("Uploaded file is empty".to_string()));
    }
    let format = TableFormat::from_file_name(&file_name)
        .ok_or_else(|| LuminaError::UnsupportedFormat(file_name.clone()))?;

    info!(file = %file_name, bytes = data.len(), "Received file");
    Ok(Upload { file_name, format, data, target })
}

/// Write the upload to a temporary file that is removed when dropped
fn spool(dir: &Path, upload: &Upload) -> crate::error::Result<tempfile::NamedTempFile> {
    let suffix = format!(".{}", upload.format.extension());
    let mut file = tempfile::Builder::new().prefix("upload-").suffix(&suffix).tempfile_in(dir)?;
    file.write_all(&upload.data)?;
    file.flush()?;
    Ok(file)
}

/// Run pipeline work off the async executor
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(format!("worker task failed: {}", e)))?
        .map_err(ServerError::from)
}

pub async fn clean_data(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Response> {
    let upload = receive_upload(multipart).await?;
    let pipeline = state.pipeline.clone();
    let data_dir = state.config.data_dir.clone();
    let format = upload.format;
    let file_name = upload.file_name.clone();

    let bytes = run_blocking(move || {
        let spooled = spool(&data_dir, &upload)?;
        pipeline.clean_file(spooled.path(), upload.format)
    })
    .await?;

    let disposition = format!("attachment; filename=\"cleaned_{}\"", file_name);
    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

pub async fn analyze_data(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Json<Value>> {
    let upload = receive_upload(multipart).await?;
    let pipeline = state.pipeline.clone();
    let data_dir = state.config.data_dir.clone();

    let outcome = run_blocking(move || {
        let spooled = spool(&data_dir, &upload)?;
        pipeline.analyze_file(spooled.path(), upload.format, upload.target.as_deref())
    })
    .await?;

    Ok(Json(json!({
        "insights": outcome.insights,
        "charts": outcome.charts,
        "model": outcome.model,
        "cleaning": outcome.cleaning,
    })))
}

/// Accept `{"records": [...]}` or a bare array of record objects
fn parse_records(body: Value) -> Result<Vec<Record>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("records") {
            Some(Value::Array(items)) => items,
            _ => return Err(ServerError::BadRequest("Expected a 'records' array".to_string())),
        },
        _ => return Err(ServerError::BadRequest("Expected an array of records".to_string())),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(Record::from_json_object(map)),
            _ => Err(ServerError::BadRequest(format!("Record {} is not an object", i))),
        })
        .collect()
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let records = parse_records(body)?;
    let pipeline = state.pipeline.clone();

    let predictions = run_blocking(move || pipeline.predict(&records)).await?;
    let predictions: Vec<Value> = predictions.iter().map(|p| p.to_json()).collect();

    Ok(Json(json!({ "predictions": predictions })))
}

pub async fn descriptive_statistics(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let upload = receive_upload(multipart).await?;
    let pipeline = state.pipeline.clone();
    let data_dir = state.config.data_dir.clone();

    let summary = run_blocking(move || {
        let spooled = spool(&data_dir, &upload)?;
        pipeline.describe_file(spooled.path(), upload.format)
    })
    .await?;

    Ok(Json(json!({ "descriptive_statistics": summary })))
}

pub async fn get_model(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let pipeline = state.pipeline.clone();
    let summary = run_blocking(move || pipeline.current_model()).await?;
    Ok(Json(json!(summary)))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.pipeline.store().is_cached(),
    }))
}

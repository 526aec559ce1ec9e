//! OCR extraction routes

use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, Result};
use crate::extract::{
    is_supported_mime, ExtractionMethod, ExtractionOptions, ExtractionRequest,
    SUPPORTED_MIME_TYPES,
};
use crate::ocr::PageRecognition;
use crate::state::AppState;

/// Hard upload ceiling. Scanned legal filings run large but bounded.
const MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/extract-text", post(extract_text))
        .route("/health", get(health))
        .route("/cleanup", post(cleanup))
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024))
}

/// Option fallbacks for clients that send flags in the query string
/// instead of multipart fields.
#[derive(Debug, Default, Deserialize)]
struct ExtractQuery {
    #[serde(rename = "forceOCR")]
    force_ocr: Option<bool>,
    language: Option<String>,
    #[serde(rename = "useSharedWorker")]
    use_shared_worker: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractTextResponse {
    success: bool,
    text: String,
    pages: usize,
    confidence: f64,
    method: ExtractionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    processing_time: String,
    text_length: usize,
    word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_results: Option<Vec<PageRecognition>>,
}

async fn extract_text(
    State(state): State<AppState>,
    Query(query): Query<ExtractQuery>,
    mut multipart: Multipart,
) -> Result<Json<ExtractTextResponse>> {
    let started = Instant::now();

    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut options = ExtractionOptions {
        language: state.config().ocr.default_language.clone(),
        ..Default::default()
    };
    if let Some(force) = query.force_ocr {
        options.force_ocr = force;
    }
    if let Some(language) = query.language {
        options.language = language;
    }
    if let Some(shared) = query.use_shared_worker {
        options.use_shared_worker = shared;
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;
                file = Some((bytes.to_vec(), mime_type, file_name));
            }
            "forceOCR" => {
                if let Ok(value) = field.text().await {
                    options.force_ocr = value == "true" || value == "1";
                }
            }
            "language" => {
                if let Ok(value) = field.text().await {
                    if !value.trim().is_empty() {
                        options.language = value.trim().to_string();
                    }
                }
            }
            "useSharedWorker" => {
                if let Ok(value) = field.text().await {
                    options.use_shared_worker = value == "true" || value == "1";
                }
            }
            _ => {}
        }
    }

    let (bytes, mime_type, file_name) = file
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::PayloadTooLarge(format!(
            "File exceeds the {} MB limit",
            MAX_FILE_SIZE / (1024 * 1024)
        )));
    }
    if !is_supported_mime(&mime_type) {
        return Err(AppError::BadRequest(format!(
            "Unsupported file type: {}. Supported: {}",
            mime_type,
            SUPPORTED_MIME_TYPES.join(", ")
        )));
    }

    tracing::info!(
        file = %file_name,
        mime = %mime_type,
        size = bytes.len(),
        force_ocr = options.force_ocr,
        language = %options.language,
        "extract-text request"
    );

    let request = ExtractionRequest {
        bytes,
        mime_type,
        file_name,
        options,
    };
    let result = state.engine().extract(&request).await?;

    let elapsed = started.elapsed().as_secs_f64();
    Ok(Json(ExtractTextResponse {
        success: !result.method.is_failed(),
        pages: result.page_count,
        confidence: result.confidence,
        method: result.method,
        error: result.error,
        processing_time: format!("{:.2}s", elapsed),
        text_length: result.text.chars().count(),
        word_count: result.text.split_whitespace().count(),
        page_results: result.per_page,
        text: result.text,
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let language = state.config().ocr.default_language.clone();
    match state.workers().probe(&language).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "status": "healthy",
                "languages": state.workers().languages(),
                "supportedFormats": SUPPORTED_MIME_TYPES,
            })),
        ),
        Err(e) => {
            tracing::error!("OCR health probe failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "status": "unhealthy",
                    "error": e.to_string(),
                })),
            )
        }
    }
}

async fn cleanup(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    state
        .workers()
        .reset()
        .await
        .map_err(|e| AppError::Internal(format!("Worker cleanup failed: {}", e)))?;

    Ok(Json(json!({
        "success": true,
        "message": "OCR workers cleaned up",
    })))
}

//! Extraction request/result types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ocr::{OcrError, PageRecognition};
use crate::raster::RasterError;

/// MIME types the extraction endpoint accepts.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/tiff",
    "image/bmp",
    "image/webp",
];

pub fn is_supported_mime(mime: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&mime)
}

pub fn is_supported_image(mime: &str) -> bool {
    mime != "application/pdf" && is_supported_mime(mime)
}

/// Caller-controlled extraction behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionOptions {
    /// Skip the text-layer attempt and go straight to OCR.
    pub force_ocr: bool,
    /// Recognition language (tesseract syntax).
    pub language: String,
    /// Use the long-lived shared worker instead of per-request workers.
    pub use_shared_worker: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            force_ocr: false,
            language: "vie+eng".to_string(),
            use_shared_worker: false,
        }
    }
}

/// One document to extract.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub options: ExtractionOptions,
}

/// How the final text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// PDF text layer was present and passed quality checks.
    DirectExtraction,
    /// Pages were rasterized and recognized.
    Ocr,
    /// Text layer and OCR output combined. Reserved; not currently emitted.
    Merged,
    /// OCR was required but the rasterization backend is not installed.
    OcrFailedMissingDependency,
    /// OCR was required but the rasterization backend is misconfigured.
    OcrFailedRendererMisconfigured,
}

impl ExtractionMethod {
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            ExtractionMethod::OcrFailedMissingDependency
                | ExtractionMethod::OcrFailedRendererMisconfigured
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::DirectExtraction => "direct_extraction",
            ExtractionMethod::Ocr => "ocr",
            ExtractionMethod::Merged => "merged",
            ExtractionMethod::OcrFailedMissingDependency => "ocr_failed_missing_dependency",
            ExtractionMethod::OcrFailedRendererMisconfigured => {
                "ocr_failed_renderer_misconfigured"
            }
        }
    }
}

/// Outcome of one extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub text: String,
    pub page_count: usize,
    /// 0-100. Direct extraction reports the policy-derived confidence; OCR
    /// reports the engine mean.
    pub confidence: f64,
    pub method: ExtractionMethod,
    /// Per-page results for multi-page OCR; `None` for single images and
    /// direct extraction.
    pub per_page: Option<Vec<PageRecognition>>,
    /// Human-readable detail when `method.is_failed()`.
    pub error: Option<String>,
}

/// Extraction error types
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("failed to read PDF text layer: {0}")]
    TextLayer(String),

    #[error("rasterization failed: {0}")]
    Raster(#[from] RasterError),

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("extraction task failed: {0}")]
    Task(String),
}

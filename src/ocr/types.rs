//! OCR Types

use serde::Serialize;
use thiserror::Error;

/// Result of recognizing a single image.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    /// Cleaned recognized text (trimmed, blank lines dropped).
    pub text: String,
    /// Engine-reported confidence, 0-100.
    pub confidence: f64,
    /// Word-level results when the engine provides them.
    pub words: Vec<OcrWord>,
}

/// Single recognized word.
#[derive(Debug, Clone)]
pub struct OcrWord {
    pub text: String,
    /// Confidence for this word, 0-100.
    pub confidence: f64,
    /// Pixel bounding box in the recognized image.
    pub bounds: WordBox,
}

/// Pixel-based bounding box.
#[derive(Debug, Clone, Copy)]
pub struct WordBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Per-page recognition result as returned to API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct PageRecognition {
    /// 1-based page number.
    pub page: usize,
    pub text: String,
    pub confidence: f64,
}

/// OCR error types
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine binary or runtime is not installed/reachable.
    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    /// A worker could not be brought up.
    #[error("failed to initialize OCR worker: {0}")]
    WorkerInit(String),

    /// The worker ran but recognition failed.
    #[error("OCR recognition failed: {0}")]
    Recognition(String),

    /// Recognition exceeded the configured deadline.
    #[error("OCR recognition timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

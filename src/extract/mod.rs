//! Text Extraction
//!
//! The decision engine behind `/extract-text`: route by MIME type, try the
//! PDF text layer first, fall back to rasterize-and-OCR when the layer is
//! absent or junk, and classify environment failures in-band so callers can
//! distinguish "this document has no text" from "this server cannot OCR".

mod engine;
mod text_layer;
mod types;

pub use engine::ExtractionEngine;
pub use text_layer::{
    MupdfTextLayer, TextLayerAssessment, TextLayerContent, TextLayerExtractor, TextLayerPolicy,
};
pub use types::{
    is_supported_image, is_supported_mime, ExtractError, ExtractionMethod, ExtractionOptions,
    ExtractionRequest, ExtractionResult, SUPPORTED_MIME_TYPES,
};

#[cfg(test)]
pub(crate) use text_layer::mock::MockTextLayer;

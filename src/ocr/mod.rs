//! OCR Module
//!
//! Wraps an external OCR engine behind a uniform recognize contract and
//! owns the worker lifecycle:
//!
//! - `engine`: the `OcrEngine`/`OcrWorker` trait pair plus the tesseract
//!   implementation
//! - `worker`: shared vs. isolated worker lifecycle management
//! - `preprocess`: raster normalization applied before recognition
//! - `aggregate`: merging per-page results into one document result

pub mod aggregate;
pub mod engine;
pub mod preprocess;
pub mod types;
pub mod worker;

pub use aggregate::{aggregate_pages, AggregatedDocument};
pub use engine::{OcrEngine, OcrWorker, TesseractEngine};
pub use preprocess::preprocess;
pub use types::{OcrError, OcrWord, PageRecognition, RecognitionResult, WordBox};
pub use worker::WorkerPool;

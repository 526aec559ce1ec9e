//! Lexscan Server Library
//!
//! Text-extraction service for legal-case document tooling. Accepts PDF and
//! raster-image uploads, chooses between direct text-layer extraction and
//! OCR, and persists results in a per-user content-addressed cache.
//!
//! # Modules
//!
//! - `extract`: decision engine and text-layer quality assessment
//! - `raster`: PDF page rasterization via MuPDF
//! - `ocr`: OCR engine adapter, worker lifecycle, preprocessing, aggregation
//! - `db`: SQLite-backed result cache
//! - `routes`: HTTP surface

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod ocr;
pub mod raster;
pub mod routes;
pub mod state;

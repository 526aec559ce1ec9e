//! HTTP Routes

pub mod ocr;
pub mod results;

//! PDF Rasterization
//!
//! Renders PDF pages to PNG images for the OCR pipeline. Pages are rendered
//! sequentially to bound peak memory on large documents; the first failing
//! page aborts the whole document.
//!
//! The backend sits behind the `Rasterizer` trait so the decision engine
//! can be exercised with a mock and so backend availability can be asserted
//! with call-count checks in tests.

mod mupdf_backend;

pub use mupdf_backend::MupdfRasterizer;

use async_trait::async_trait;
use thiserror::Error;

/// Default resolution multiplier. 2.5-3.0 balances OCR accuracy against
/// memory and render time.
pub const DEFAULT_SCALE: f32 = 2.5;

/// Neither rendered dimension may exceed this; the per-page scale is
/// recomputed when it would.
pub const MAX_PAGE_DIMENSION: f32 = 3000.0;

/// A single rendered PDF page.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// 1-based page number.
    pub page_index: usize,
    /// PNG-encoded image data, composited over opaque white.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Rasterization error taxonomy.
///
/// `BackendUnavailable` and `BackendMisconfigured` are environment problems
/// requiring operator intervention; the decision engine reports them in-band
/// instead of failing the request. Everything else is a per-document error.
#[derive(Debug, Clone, Error)]
pub enum RasterError {
    /// The rendering backend could not be located at all. The statically
    /// linked mupdf backend never produces this; it exists for backends
    /// resolved from the environment at startup.
    #[error("rasterization backend is not available: {0}")]
    BackendUnavailable(String),

    /// The backend is present but failed its startup probe (see
    /// `MupdfRasterizer::new`); replayed on every call until restart.
    #[error("rasterization backend loaded but is misconfigured: {0}")]
    BackendMisconfigured(String),

    #[error("cannot open PDF document: {0}")]
    InvalidDocument(String),

    #[error("failed to render page {page}: {message}")]
    PageRender { page: usize, message: String },

    #[error("render task failed: {0}")]
    RenderTask(String),
}

/// Renders every page of a PDF to a raster image.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render all pages at the given scale, ordered by ascending 1-based
    /// page index. Fails fast: no partial page list is ever returned.
    async fn rasterize(&self, pdf: &[u8], scale: f32) -> Result<Vec<RasterPage>, RasterError>;
}

/// Minimal single-page blank PDF used for the startup probe and in tests.
/// MuPDF's xref repair path accepts it.
pub(crate) const BLANK_PDF: &[u8] = b"%PDF-1.4\n\
1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n\
2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj\n\
3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]>>endobj\n\
trailer<</Root 1 0 R/Size 4>>\n\
%%EOF";

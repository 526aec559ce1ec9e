//! MuPDF-backed rasterizer
//!
//! Renders pages through MuPDF inside `spawn_blocking` (MuPDF work is
//! CPU-bound and its types are not `Send`). The backend is probed once at
//! construction; a failed probe is replayed as a classified error on every
//! call instead of being re-detected by string-matching downstream.

use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix};

use super::{RasterError, RasterPage, Rasterizer, BLANK_PDF, MAX_PAGE_DIMENSION};

pub struct MupdfRasterizer {
    /// Startup probe outcome, replayed on each call when the probe failed.
    probe: Result<(), RasterError>,
}

impl MupdfRasterizer {
    pub fn new() -> Self {
        let probe = Self::probe_backend();
        if let Err(e) = &probe {
            tracing::error!("PDF rasterization backend unavailable: {}", e);
        }
        Self { probe }
    }

    /// Open and page-count a known-good blank document. Failure here means
    /// the MuPDF context itself is broken, not that any input is bad.
    fn probe_backend() -> Result<(), RasterError> {
        let doc = Document::from_bytes(BLANK_PDF, "application/pdf")
            .map_err(|e| RasterError::BackendMisconfigured(e.to_string()))?;
        doc.page_count()
            .map_err(|e| RasterError::BackendMisconfigured(e.to_string()))?;
        Ok(())
    }
}

impl Default for MupdfRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rasterizer for MupdfRasterizer {
    async fn rasterize(&self, pdf: &[u8], scale: f32) -> Result<Vec<RasterPage>, RasterError> {
        self.probe.clone()?;

        let data = pdf.to_vec();
        tokio::task::spawn_blocking(move || rasterize_blocking(&data, scale))
            .await
            .map_err(|e| RasterError::RenderTask(format!("Task join error: {}", e)))?
    }
}

fn rasterize_blocking(data: &[u8], scale: f32) -> Result<Vec<RasterPage>, RasterError> {
    let doc = Document::from_bytes(data, "application/pdf")
        .map_err(|e| RasterError::InvalidDocument(e.to_string()))?;
    let page_count = doc
        .page_count()
        .map_err(|e| RasterError::InvalidDocument(e.to_string()))? as usize;

    if page_count == 0 {
        return Err(RasterError::InvalidDocument("PDF has no pages".to_string()));
    }

    let mut pages = Vec::with_capacity(page_count);

    // Sequential on purpose: rendering holds page-sized buffers and large
    // scanned filings can run to hundreds of pages.
    for idx in 0..page_count {
        let page_number = idx + 1;
        let page = render_page(&doc, idx, scale).map_err(|message| RasterError::PageRender {
            page: page_number,
            message,
        })?;

        tracing::debug!(
            page = page_number,
            total = page_count,
            width = page.width,
            height = page.height,
            bytes = page.data.len(),
            "rasterized page"
        );
        pages.push(page);
    }

    Ok(pages)
}

fn render_page(doc: &Document, idx: usize, scale: f32) -> Result<RasterPage, String> {
    let page = doc.load_page(idx as i32).map_err(|e| e.to_string())?;
    let bounds = page.bounds().map_err(|e| e.to_string())?;

    let page_width = bounds.x1 - bounds.x0;
    let page_height = bounds.y1 - bounds.y0;

    // Clamp so neither rendered dimension exceeds the maximum, preserving
    // aspect ratio by recomputing a single per-page scale.
    let mut page_scale = scale;
    if page_width * scale > MAX_PAGE_DIMENSION || page_height * scale > MAX_PAGE_DIMENSION {
        page_scale = (MAX_PAGE_DIMENSION / page_width).min(MAX_PAGE_DIMENSION / page_height);
    }

    let matrix = Matrix::new_scale(page_scale, page_scale);
    let colorspace = Colorspace::device_rgb();
    let pixmap = page
        .to_pixmap(&matrix, &colorspace, true, false)
        .map_err(|e| e.to_string())?;

    let (data, width, height) = encode_over_white(&pixmap).map_err(|e| e.to_string())?;

    Ok(RasterPage {
        page_index: idx + 1,
        data,
        width,
        height,
    })
}

/// Encode a pixmap as PNG, compositing any alpha over opaque white.
/// OCR accuracy degrades sharply on transparent or black backgrounds.
fn encode_over_white(pixmap: &mupdf::Pixmap) -> Result<(Vec<u8>, u32, u32), image::ImageError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgb_buffer = Vec::with_capacity((width * height * 3) as usize);

    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(255) as u32;
            let g = samples.get(offset + 1).copied().unwrap_or(255) as u32;
            let b = samples.get(offset + 2).copied().unwrap_or(255) as u32;
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255) as u32
            } else {
                255
            };
            rgb_buffer.push(((r * a + 255 * (255 - a)) / 255) as u8);
            rgb_buffer.push(((g * a + 255 * (255 - a)) / 255) as u8);
            rgb_buffer.push(((b * a + 255 * (255 - a)) / 255) as u8);
        }
    }

    let img = RgbImage::from_raw(width, height, rgb_buffer).ok_or_else(|| {
        image::ImageError::Parameter(image::error::ParameterError::from_kind(
            image::error::ParameterErrorKind::DimensionMismatch,
        ))
    })?;

    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)?;

    Ok((output, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rasterize_blank_pdf() {
        let rasterizer = MupdfRasterizer::new();
        let pages = rasterizer.rasterize(BLANK_PDF, 2.5).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_index, 1);
        assert!(pages[0].width > 0);
        assert!(pages[0].height > 0);

        // Rendered blank page must be white, not transparent or black.
        let img = image::load_from_memory(&pages[0].data).unwrap().to_luma8();
        let center = img.get_pixel(img.width() / 2, img.height() / 2);
        assert_eq!(center.0[0], 255);
    }

    #[tokio::test]
    async fn test_dimension_clamp() {
        let rasterizer = MupdfRasterizer::new();
        // 612x792pt page at 10x would be 6120x7920; must be clamped.
        let pages = rasterizer.rasterize(BLANK_PDF, 10.0).await.unwrap();

        assert!(pages[0].width as f32 <= MAX_PAGE_DIMENSION);
        assert!(pages[0].height as f32 <= MAX_PAGE_DIMENSION);
        // Aspect ratio of US Letter is preserved within rounding.
        let ratio = pages[0].width as f32 / pages[0].height as f32;
        assert!((ratio - 612.0 / 792.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_invalid_document() {
        let rasterizer = MupdfRasterizer::new();
        let result = rasterizer.rasterize(b"not a pdf at all", 2.5).await;
        assert!(matches!(result, Err(RasterError::InvalidDocument(_))));
    }
}

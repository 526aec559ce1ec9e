//! Extraction decision engine
//!
//! Orchestrates the full pipeline for one request: MIME routing, the
//! text-layer-first attempt for PDFs, rasterization, preprocessing, OCR,
//! and page aggregation. Environment failures (no rasterization backend)
//! are reported in-band so the caller gets a structured verdict rather
//! than a bare 500.

use std::sync::Arc;

use crate::ocr::{aggregate_pages, preprocess, PageRecognition, WorkerPool};
use crate::raster::{RasterError, Rasterizer};

use super::text_layer::{TextLayerAssessment, TextLayerExtractor, TextLayerPolicy};
use super::types::{
    is_supported_image, ExtractError, ExtractionMethod, ExtractionRequest, ExtractionResult,
};

pub struct ExtractionEngine {
    text_layer: Arc<dyn TextLayerExtractor>,
    rasterizer: Arc<dyn Rasterizer>,
    workers: Arc<WorkerPool>,
    policy: TextLayerPolicy,
    raster_scale: f32,
}

impl ExtractionEngine {
    pub fn new(
        text_layer: Arc<dyn TextLayerExtractor>,
        rasterizer: Arc<dyn Rasterizer>,
        workers: Arc<WorkerPool>,
        policy: TextLayerPolicy,
        raster_scale: f32,
    ) -> Self {
        Self {
            text_layer,
            rasterizer,
            workers,
            policy,
            raster_scale,
        }
    }

    pub async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractError> {
        match request.mime_type.as_str() {
            "application/pdf" => self.extract_pdf(request).await,
            mime if is_supported_image(mime) => self.extract_image(request).await,
            other => Err(ExtractError::UnsupportedType(other.to_string())),
        }
    }

    async fn extract_pdf(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractError> {
        if !request.options.force_ocr {
            // A broken text layer is not fatal: log and fall through to OCR.
            match self.text_layer.extract_text(&request.bytes).await {
                Ok(content) => {
                    let assessment = TextLayerAssessment::from_text(&content.text, &self.policy);
                    tracing::debug!(
                        file = %request.file_name,
                        pages = content.page_count,
                        chars = assessment.char_count,
                        words = assessment.word_count,
                        real = assessment.is_real_text,
                        "assessed PDF text layer"
                    );

                    if assessment.accepts_direct(&self.policy) {
                        return Ok(ExtractionResult {
                            text: content.text.trim().to_string(),
                            page_count: content.page_count.max(1),
                            confidence: assessment.derived_confidence(),
                            method: ExtractionMethod::DirectExtraction,
                            per_page: None,
                            error: None,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        file = %request.file_name,
                        "text layer extraction failed, falling back to OCR: {}",
                        e
                    );
                }
            }
        }

        let pages = match self.rasterizer.rasterize(&request.bytes, self.raster_scale).await {
            Ok(pages) => pages,
            Err(e @ RasterError::BackendUnavailable(_)) => {
                return Ok(failure_result(
                    ExtractionMethod::OcrFailedMissingDependency,
                    &e,
                ));
            }
            Err(e @ RasterError::BackendMisconfigured(_)) => {
                return Ok(failure_result(
                    ExtractionMethod::OcrFailedRendererMisconfigured,
                    &e,
                ));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            file = %request.file_name,
            pages = pages.len(),
            language = %request.options.language,
            "running OCR over rasterized PDF"
        );

        // Pages share one worker to amortize engine spin-up, and run
        // sequentially so the marker order matches page order.
        let mut per_page = Vec::with_capacity(pages.len());
        for page in &pages {
            let data = page.data.clone();
            let prepared = tokio::task::spawn_blocking(move || preprocess(&data))
                .await
                .map_err(|e| ExtractError::Task(format!("Task join error: {}", e)))?;

            let recognized = self
                .workers
                .recognize_shared(&request.options.language, &prepared)
                .await?;

            tracing::debug!(
                page = page.page_index,
                confidence = recognized.confidence,
                chars = recognized.text.chars().count(),
                "recognized page"
            );

            per_page.push(PageRecognition {
                page: page.page_index,
                text: recognized.text,
                confidence: recognized.confidence,
            });
        }

        let aggregated = aggregate_pages(&per_page);

        Ok(ExtractionResult {
            text: aggregated.text,
            page_count: aggregated.page_count,
            confidence: aggregated.confidence,
            method: ExtractionMethod::Ocr,
            per_page: Some(per_page),
            error: None,
        })
    }

    async fn extract_image(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractError> {
        let data = request.bytes.clone();
        let prepared = tokio::task::spawn_blocking(move || preprocess(&data))
            .await
            .map_err(|e| ExtractError::Task(format!("Task join error: {}", e)))?;

        // Single images default to an isolated worker; there is no batch to
        // amortize spin-up over.
        let recognized = if request.options.use_shared_worker {
            self.workers
                .recognize_shared(&request.options.language, &prepared)
                .await?
        } else {
            self.workers
                .recognize_isolated(&request.options.language, &prepared)
                .await?
        };

        Ok(ExtractionResult {
            text: recognized.text,
            page_count: 1,
            confidence: recognized.confidence,
            method: ExtractionMethod::Ocr,
            per_page: None,
            error: None,
        })
    }
}

fn failure_result(method: ExtractionMethod, error: &RasterError) -> ExtractionResult {
    tracing::error!("OCR unavailable ({}): {}", method.as_str(), error);
    ExtractionResult {
        text: String::new(),
        page_count: 0,
        confidence: 0.0,
        method,
        per_page: None,
        error: Some(error.to_string()),
    }
}

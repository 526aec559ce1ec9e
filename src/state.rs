//! Application State

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::ResultStore;
use crate::extract::{ExtractionEngine, MupdfTextLayer};
use crate::ocr::{TesseractEngine, WorkerPool};
use crate::raster::MupdfRasterizer;

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    results: ResultStore,
    engine: ExtractionEngine,
    workers: Arc<WorkerPool>,
}

impl AppState {
    /// Wire up the production pipeline: mupdf text layer and rasterizer,
    /// tesseract OCR.
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        let ocr_engine = Arc::new(TesseractEngine::new(&config.ocr));
        let workers = Arc::new(WorkerPool::new(
            ocr_engine,
            Duration::from_secs(config.ocr.timeout_secs),
        ));

        let engine = ExtractionEngine::new(
            Arc::new(MupdfTextLayer),
            Arc::new(MupdfRasterizer::new()),
            workers.clone(),
            config.extraction.policy.clone(),
            config.extraction.raster_scale,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                results: ResultStore::new(pool),
                engine,
                workers,
            }),
        }
    }

    /// Assemble state from pre-built components. Used by tests to swap in
    /// mock pipeline stages.
    pub fn with_components(
        config: Config,
        pool: SqlitePool,
        engine: ExtractionEngine,
        workers: Arc<WorkerPool>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                results: ResultStore::new(pool),
                engine,
                workers,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn results(&self) -> &ResultStore {
        &self.inner.results
    }

    pub fn engine(&self) -> &ExtractionEngine {
        &self.inner.engine
    }

    pub fn workers(&self) -> &Arc<WorkerPool> {
        &self.inner.workers
    }
}

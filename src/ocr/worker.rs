//! Worker lifecycle management
//!
//! Two lifecycle modes over the same engine:
//!
//! - shared: one lazily-created worker is kept alive and reused across
//!   requests, amortizing engine spin-up over a batch of pages
//! - isolated: a fresh worker per recognition, terminated on every path
//!
//! The shared worker is serialized behind a tokio mutex; recognition order
//! within a request is preserved and concurrent requests queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::engine::{OcrEngine, OcrWorker};
use super::types::{OcrError, RecognitionResult};

struct SharedSlot {
    language: String,
    worker: Box<dyn OcrWorker>,
}

/// Owns worker lifecycles for one engine.
pub struct WorkerPool {
    engine: Arc<dyn OcrEngine>,
    timeout: Duration,
    shared: Mutex<Option<SharedSlot>>,
}

impl WorkerPool {
    pub fn new(engine: Arc<dyn OcrEngine>, timeout: Duration) -> Self {
        Self {
            engine,
            timeout,
            shared: Mutex::new(None),
        }
    }

    /// Recognize with the shared worker, creating it on first use.
    ///
    /// A language change tears down the previous worker and spawns a new
    /// one. A timed-out recognition leaves the worker in place; tesseract
    /// sessions hold no per-image state, so the next call can reuse it.
    pub async fn recognize_shared(
        &self,
        language: &str,
        image: &[u8],
    ) -> Result<RecognitionResult, OcrError> {
        let mut slot = self.shared.lock().await;

        let needs_spawn = match slot.as_ref() {
            Some(s) => s.language != language,
            None => true,
        };

        if needs_spawn {
            if let Some(old) = slot.take() {
                tracing::debug!(
                    from = %old.language,
                    to = %language,
                    "replacing shared OCR worker for language change"
                );
                if let Err(e) = old.worker.terminate().await {
                    tracing::warn!("failed to terminate shared OCR worker: {}", e);
                }
            } else {
                tracing::debug!(language = %language, "initializing shared OCR worker");
            }

            let worker = self.engine.spawn_worker(language).await?;
            *slot = Some(SharedSlot {
                language: language.to_string(),
                worker,
            });
        }

        let Some(current) = slot.as_ref() else {
            return Err(OcrError::WorkerInit(
                "shared worker missing after initialization".to_string(),
            ));
        };

        self.recognize_with_deadline(current.worker.as_ref(), image)
            .await
    }

    /// Recognize with a throwaway worker, terminated on all paths.
    pub async fn recognize_isolated(
        &self,
        language: &str,
        image: &[u8],
    ) -> Result<RecognitionResult, OcrError> {
        let worker = self.engine.spawn_worker(language).await?;

        let outcome = self.recognize_with_deadline(worker.as_ref(), image).await;

        if let Err(e) = worker.terminate().await {
            tracing::warn!("failed to terminate isolated OCR worker: {}", e);
        }

        outcome
    }

    async fn recognize_with_deadline(
        &self,
        worker: &dyn OcrWorker,
        image: &[u8],
    ) -> Result<RecognitionResult, OcrError> {
        match tokio::time::timeout(self.timeout, worker.recognize(image)).await {
            Ok(result) => result,
            Err(_) => Err(OcrError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Tear down the shared worker if one exists. Idempotent; used by the
    /// cleanup endpoint and at shutdown.
    pub async fn reset(&self) -> Result<(), OcrError> {
        let taken = self.shared.lock().await.take();
        if let Some(slot) = taken {
            tracing::info!(language = %slot.language, "terminating shared OCR worker");
            slot.worker.terminate().await?;
        }
        Ok(())
    }

    /// Spawn-and-terminate a worker to verify the engine is usable.
    pub async fn probe(&self, language: &str) -> Result<(), OcrError> {
        let worker = self.engine.spawn_worker(language).await?;
        worker.terminate().await
    }

    pub fn languages(&self) -> Vec<String> {
        self.engine.languages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::engine::mock::MockEngine;
    use std::sync::atomic::Ordering;

    fn pool_with(engine: MockEngine) -> (WorkerPool, Arc<super::super::engine::mock::MockEngineState>) {
        let state = engine.state.clone();
        (
            WorkerPool::new(Arc::new(engine), Duration::from_secs(5)),
            state,
        )
    }

    #[tokio::test]
    async fn test_shared_worker_initialized_once() {
        let (pool, state) = pool_with(MockEngine::with_text("hello", 90.0));

        let a = pool.recognize_shared("eng", b"img").await.unwrap();
        let b = pool.recognize_shared("eng", b"img").await.unwrap();

        assert_eq!(a.text, "hello");
        assert_eq!(b.text, "hello");
        assert_eq!(state.spawned.load(Ordering::SeqCst), 1);
        assert_eq!(state.recognized.load(Ordering::SeqCst), 2);
        assert_eq!(state.terminated.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shared_worker_respawns_on_language_change() {
        let (pool, state) = pool_with(MockEngine::with_text("xin chào", 85.0));

        pool.recognize_shared("eng", b"img").await.unwrap();
        pool.recognize_shared("vie", b"img").await.unwrap();

        assert_eq!(state.spawned.load(Ordering::SeqCst), 2);
        assert_eq!(state.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_isolated_worker_terminated_per_call() {
        let (pool, state) = pool_with(MockEngine::with_text("one shot", 80.0));

        pool.recognize_isolated("eng", b"img").await.unwrap();
        pool.recognize_isolated("eng", b"img").await.unwrap();

        assert_eq!(state.spawned.load(Ordering::SeqCst), 2);
        assert_eq!(state.terminated.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_isolated_worker_terminated_on_failure() {
        let mut engine = MockEngine::with_text("", 0.0);
        engine.fail_recognition = true;
        let (pool, state) = pool_with(engine);

        let result = pool.recognize_isolated("eng", b"img").await;

        assert!(matches!(result, Err(OcrError::Recognition(_))));
        assert_eq!(state.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let (pool, state) = pool_with(MockEngine::with_text("text", 70.0));

        pool.recognize_shared("eng", b"img").await.unwrap();
        pool.reset().await.unwrap();
        pool.reset().await.unwrap();

        assert_eq!(state.terminated.load(Ordering::SeqCst), 1);

        // Next shared call spawns a fresh worker.
        pool.recognize_shared("eng", b"img").await.unwrap();
        assert_eq!(state.spawned.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_engine_unavailable_propagates() {
        let mut engine = MockEngine::with_text("", 0.0);
        engine.unavailable = true;
        let (pool, _) = pool_with(engine);

        let result = pool.recognize_shared("eng", b"img").await;
        assert!(matches!(result, Err(OcrError::EngineUnavailable(_))));
    }
}

//! OCR engine adapter
//!
//! Defines the engine/worker trait pair and the tesseract implementation.
//! A worker is one configured engine session; spawning it carries the
//! engine's startup cost, so callers that batch pages reuse one worker
//! (see `worker::WorkerPool`).

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::process::Command;
use uuid::Uuid;

use crate::config::OcrConfig;

use super::types::{OcrError, OcrWord, RecognitionResult, WordBox};

/// OCR engine factory. Implementations own engine configuration; workers
/// own per-session state.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Bring up a worker configured for the given language. Fails with
    /// `EngineUnavailable` when the underlying engine is not installed.
    async fn spawn_worker(&self, language: &str) -> Result<Box<dyn OcrWorker>, OcrError>;

    /// Languages this engine is configured to serve.
    fn languages(&self) -> Vec<String>;
}

/// One live OCR session.
#[async_trait]
pub trait OcrWorker: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult, OcrError>;

    /// Release the worker's resources. Idempotent.
    async fn terminate(&self) -> Result<(), OcrError>;
}

/// Tesseract CLI engine.
///
/// Recognition shells out to the `tesseract` binary with both `txt` and
/// `tsv` outputs: the text output is what callers consume, the TSV gives
/// word-level confidences and boxes.
pub struct TesseractEngine {
    binary: PathBuf,
    char_whitelist: String,
    languages: Vec<String>,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: PathBuf::from(&config.tesseract_bin),
            char_whitelist: config.char_whitelist.clone(),
            languages: vec![
                "vie".to_string(),
                "eng".to_string(),
                "vie+eng".to_string(),
            ],
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn spawn_worker(&self, language: &str) -> Result<Box<dyn OcrWorker>, OcrError> {
        // Resolve the binary up front so a missing install is classified as
        // engine-unavailable rather than a per-image recognition failure.
        let probe = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                OcrError::EngineUnavailable(format!(
                    "tesseract binary '{}' could not be run: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !probe.status.success() {
            return Err(OcrError::EngineUnavailable(format!(
                "tesseract binary '{}' exited with {}",
                self.binary.display(),
                probe.status
            )));
        }

        let workdir = TempDir::with_prefix("lexscan-ocr")
            .map_err(|e| OcrError::WorkerInit(format!("cannot create work directory: {}", e)))?;

        Ok(Box::new(TesseractWorker {
            binary: self.binary.clone(),
            language: language.to_string(),
            char_whitelist: self.char_whitelist.clone(),
            workdir: Mutex::new(Some(workdir)),
        }))
    }

    fn languages(&self) -> Vec<String> {
        self.languages.clone()
    }
}

struct TesseractWorker {
    binary: PathBuf,
    language: String,
    char_whitelist: String,
    /// Scratch directory for image/output files; taken on terminate.
    workdir: Mutex<Option<TempDir>>,
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult, OcrError> {
        let dir = self
            .workdir
            .lock()
            .as_ref()
            .map(|d| d.path().to_path_buf())
            .ok_or_else(|| OcrError::Recognition("worker already terminated".to_string()))?;

        let stem = Uuid::new_v4().to_string();
        let input_path = dir.join(format!("{}.png", stem));
        let output_base = dir.join(&stem);

        tokio::fs::write(&input_path, image).await?;

        let output = Command::new(&self.binary)
            .arg(&input_path)
            .arg(&output_base)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg("3")
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", self.char_whitelist))
            .arg("-c")
            .arg("preserve_interword_spaces=1")
            .arg("txt")
            .arg("tsv")
            .output()
            .await
            .map_err(|e| OcrError::Recognition(format!("failed to run tesseract: {}", e)))?;

        let _ = tokio::fs::remove_file(&input_path).await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let txt_path = output_base.with_extension("txt");
        let tsv_path = output_base.with_extension("tsv");

        let text = tokio::fs::read_to_string(&txt_path).await?;
        let tsv = tokio::fs::read_to_string(&tsv_path).await.unwrap_or_default();

        let _ = tokio::fs::remove_file(&txt_path).await;
        let _ = tokio::fs::remove_file(&tsv_path).await;

        let words = parse_tsv_words(&tsv);
        let confidence = mean_word_confidence(&words);

        Ok(RecognitionResult {
            text: clean_recognized_text(&text),
            confidence,
            words,
        })
    }

    async fn terminate(&self) -> Result<(), OcrError> {
        let taken = self.workdir.lock().take();
        if let Some(dir) = taken {
            dir.close()?;
        }
        Ok(())
    }
}

/// Strip engine artifacts without altering content: trim the whole text,
/// trim each line, drop blank lines.
pub fn clean_recognized_text(raw: &str) -> String {
    raw.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse word rows (level 5) out of tesseract TSV output.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text.
pub fn parse_tsv_words(tsv: &str) -> Vec<OcrWord> {
    let mut words = Vec::new();

    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }

        let text = cols[11].trim();
        let confidence: f64 = match cols[10].parse() {
            Ok(c) => c,
            Err(_) => continue,
        };
        if text.is_empty() || confidence < 0.0 {
            continue;
        }

        let parse_u32 = |s: &str| s.parse::<u32>().unwrap_or(0);
        words.push(OcrWord {
            text: text.to_string(),
            confidence,
            bounds: WordBox {
                x: parse_u32(cols[6]),
                y: parse_u32(cols[7]),
                width: parse_u32(cols[8]),
                height: parse_u32(cols[9]),
            },
        });
    }

    words
}

fn mean_word_confidence(words: &[OcrWord]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    words.iter().map(|w| w.confidence).sum::<f64>() / words.len() as f64
}

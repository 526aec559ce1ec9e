//! Configuration management for Lexscan Server

use serde::Deserialize;
use std::env;

use crate::extract::TextLayerPolicy;

/// Characters the OCR engine is allowed to emit.
///
/// Covers digits, Latin letters, the full Vietnamese diacritic set, and
/// common punctuation found in legal documents. Everything else is treated
/// as recognition noise.
pub const DEFAULT_CHAR_WHITELIST: &str = r#"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyzÀÁÂÃÈÉÊÌÍÒÓÔÕÙÚĂĐĨŨƠàáâãèéêìíòóôõùúăđĩũơƯĂẠẢẤẦẨẪẬẮẰẲẴẶẸẺẼỀỀỂưăạảấầẩẫậắằẳẵặẹẻẽềềểỄỆỈỊỌỎỐỒỔỖỘỚỜỞỠỢỤỦỨỪễệỉịọỏốồổỗộớờởỡợụủứừỬỮỰỲỴÝỶỸửữựỳỵýỷỹ.,;:!?"'()[]{}-/"#;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ocr: OcrConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Default recognition language passed to the engine (tesseract syntax,
    /// `+` joins multiple languages).
    pub default_language: String,
    /// Path to the tesseract binary. Resolved once at startup; a bad path
    /// surfaces as an engine-unavailable failure, not a crash.
    pub tesseract_bin: String,
    /// Per-recognition deadline in seconds.
    pub timeout_secs: u64,
    /// Allowed-character whitelist handed to the engine.
    pub char_whitelist: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Resolution multiplier for PDF rasterization.
    pub raster_scale: f32,
    /// Text-layer acceptance thresholds. Empirically chosen cutoffs carried
    /// over from production; tune via env vars, do not re-derive.
    pub policy: TextLayerPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./lexscan.db".to_string(),
            },
            ocr: OcrConfig {
                default_language: "vie+eng".to_string(),
                tesseract_bin: "tesseract".to_string(),
                timeout_secs: 120,
                char_whitelist: DEFAULT_CHAR_WHITELIST.to_string(),
            },
            extraction: ExtractionConfig {
                raster_scale: crate::raster::DEFAULT_SCALE,
                policy: TextLayerPolicy::default(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            ocr: OcrConfig {
                default_language: env::var("OCR_LANGUAGE").unwrap_or(defaults.ocr.default_language),
                tesseract_bin: env::var("TESSERACT_BIN").unwrap_or(defaults.ocr.tesseract_bin),
                timeout_secs: env::var("OCR_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.ocr.timeout_secs),
                char_whitelist: env::var("OCR_CHAR_WHITELIST")
                    .unwrap_or(defaults.ocr.char_whitelist),
            },
            extraction: ExtractionConfig {
                raster_scale: env::var("EXTRACT_RASTER_SCALE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.extraction.raster_scale),
                policy: TextLayerPolicy {
                    min_chars: env_usize("EXTRACT_MIN_CHARS", defaults.extraction.policy.min_chars),
                    min_non_whitespace: env_usize(
                        "EXTRACT_MIN_NON_WHITESPACE",
                        defaults.extraction.policy.min_non_whitespace,
                    ),
                    assess_min_words: env_usize(
                        "EXTRACT_ASSESS_MIN_WORDS",
                        defaults.extraction.policy.assess_min_words,
                    ),
                    accept_min_words: env_usize(
                        "EXTRACT_ACCEPT_MIN_WORDS",
                        defaults.extraction.policy.accept_min_words,
                    ),
                    min_confidence: env::var("EXTRACT_MIN_CONFIDENCE")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(defaults.extraction.policy.min_confidence),
                },
            },
        })
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

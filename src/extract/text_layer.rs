//! PDF text-layer extraction and quality assessment
//!
//! Scanned PDFs often carry a vestigial text layer: a few stray characters
//! from a failed embedded OCR pass, or metadata junk. The assessment here
//! decides whether the layer is real prose worth returning or noise that
//! must be discarded in favor of rasterize-and-OCR.

use async_trait::async_trait;
use mupdf::Document;
use serde::Deserialize;

use super::types::ExtractError;

/// Thresholds for accepting a PDF text layer.
#[derive(Debug, Clone, Deserialize)]
pub struct TextLayerPolicy {
    /// Minimum total characters for the layer to count as real text.
    pub min_chars: usize,
    /// Minimum non-whitespace characters.
    pub min_non_whitespace: usize,
    /// Minimum words for the layer to count as real text.
    pub assess_min_words: usize,
    /// Stricter word floor applied before returning the layer directly.
    pub accept_min_words: usize,
    /// Minimum derived confidence for direct acceptance.
    pub min_confidence: f64,
}

impl Default for TextLayerPolicy {
    fn default() -> Self {
        Self {
            min_chars: 100,
            min_non_whitespace: 50,
            assess_min_words: 10,
            accept_min_words: 15,
            min_confidence: 80.0,
        }
    }
}

/// Measured properties of an extracted text layer.
#[derive(Debug, Clone)]
pub struct TextLayerAssessment {
    pub char_count: usize,
    pub non_whitespace_count: usize,
    pub word_count: usize,
    pub has_letters: bool,
    /// True when the layer looks like real prose under the policy.
    pub is_real_text: bool,
}

impl TextLayerAssessment {
    pub fn from_text(text: &str, policy: &TextLayerPolicy) -> Self {
        let char_count = text.chars().count();
        let non_whitespace_count = text.chars().filter(|c| !c.is_whitespace()).count();
        let word_count = text.split_whitespace().count();
        let has_letters = text.chars().any(|c| c.is_alphabetic());

        let is_real_text = char_count > policy.min_chars
            && non_whitespace_count > policy.min_non_whitespace
            && word_count > policy.assess_min_words
            && has_letters;

        Self {
            char_count,
            non_whitespace_count,
            word_count,
            has_letters,
            is_real_text,
        }
    }

    /// Binary confidence: a layer either looks like real text or it does
    /// not. There is no engine score to grade it on.
    pub fn derived_confidence(&self) -> f64 {
        if self.is_real_text {
            100.0
        } else {
            30.0
        }
    }

    /// Whether the layer may be returned without OCR. Stricter than
    /// `is_real_text`: borderline layers still go through OCR.
    pub fn accepts_direct(&self, policy: &TextLayerPolicy) -> bool {
        self.is_real_text
            && self.word_count > policy.accept_min_words
            && self.derived_confidence() >= policy.min_confidence
    }
}

/// Text layer pulled from a PDF, with the document's page count.
#[derive(Debug, Clone)]
pub struct TextLayerContent {
    pub text: String,
    pub page_count: usize,
}

/// Pulls the embedded text layer out of a PDF.
#[async_trait]
pub trait TextLayerExtractor: Send + Sync {
    /// Concatenated text of every page (pages separated by newlines) plus
    /// the page count.
    async fn extract_text(&self, pdf: &[u8]) -> Result<TextLayerContent, ExtractError>;
}

/// MuPDF text-layer extractor.
pub struct MupdfTextLayer;

#[async_trait]
impl TextLayerExtractor for MupdfTextLayer {
    async fn extract_text(&self, pdf: &[u8]) -> Result<TextLayerContent, ExtractError> {
        let data = pdf.to_vec();
        tokio::task::spawn_blocking(move || extract_blocking(&data))
            .await
            .map_err(|e| ExtractError::Task(format!("Task join error: {}", e)))?
    }
}

fn extract_blocking(data: &[u8]) -> Result<TextLayerContent, ExtractError> {
    let doc = Document::from_bytes(data, "application/pdf")
        .map_err(|e| ExtractError::TextLayer(e.to_string()))?;
    let page_count = doc
        .page_count()
        .map_err(|e| ExtractError::TextLayer(e.to_string()))?;

    let mut text = String::new();
    for idx in 0..page_count {
        let page = doc
            .load_page(idx)
            .map_err(|e| ExtractError::TextLayer(e.to_string()))?;
        let page_text = page
            .to_text()
            .map_err(|e| ExtractError::TextLayer(e.to_string()))?;
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&page_text);
    }

    Ok(TextLayerContent {
        text,
        page_count: page_count.max(0) as usize,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    fn real_prose() -> String {
        "Quyết định số 123/QĐ-UBND về việc phê duyệt kế hoạch sử dụng đất \
         năm 2024 của huyện, căn cứ Luật Đất đai và các văn bản hướng dẫn \
         thi hành, xét đề nghị của Sở Tài nguyên và Môi trường."
            .to_string()
    }

    #[test]
    fn test_real_prose_accepted() {
        let policy = TextLayerPolicy::default();
        let a = TextLayerAssessment::from_text(&real_prose(), &policy);

        assert!(a.is_real_text);
        assert!(a.accepts_direct(&policy));
        assert_eq!(a.derived_confidence(), 100.0);
    }

    #[test]
    fn test_short_layer_rejected() {
        let policy = TextLayerPolicy::default();
        let a = TextLayerAssessment::from_text("Trang 1", &policy);

        assert!(!a.is_real_text);
        assert!(!a.accepts_direct(&policy));
        assert_eq!(a.derived_confidence(), 30.0);
    }

    #[test]
    fn test_numeric_junk_rejected() {
        // Long enough but no letters: scanner artifacts and page numbers.
        let junk = "123 456 789 012 345 678 901 234 567 890 ".repeat(5);
        let policy = TextLayerPolicy::default();
        let a = TextLayerAssessment::from_text(&junk, &policy);

        assert!(!a.has_letters);
        assert!(!a.is_real_text);
    }

    #[test]
    fn test_whitespace_padding_rejected() {
        // Plenty of characters, almost all whitespace.
        let padded = format!("ab{}", " ".repeat(300));
        let policy = TextLayerPolicy::default();
        let a = TextLayerAssessment::from_text(&padded, &policy);

        assert!(a.char_count > policy.min_chars);
        assert!(!a.is_real_text);
    }

    #[test]
    fn test_borderline_word_count_not_direct() {
        // Passes the assessment floor (>10 words) but not the stricter
        // direct-acceptance floor (>15 words).
        let text = format!(
            "mười hai từ tiếng Việt được lặp lại cho đủ dài {}",
            "x".repeat(120)
        );
        let policy = TextLayerPolicy::default();
        let a = TextLayerAssessment::from_text(&text, &policy);

        assert!(a.is_real_text);
        assert!(a.word_count <= policy.accept_min_words);
        assert!(!a.accepts_direct(&policy));
    }
}

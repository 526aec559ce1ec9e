//! Page aggregation
//!
//! Merges per-page recognition results into one document body. Multi-page
//! documents get a marker line before each page so downstream consumers
//! can locate page boundaries in the flat text.

use super::types::PageRecognition;

/// Combined text and confidence for a whole document.
#[derive(Debug, Clone)]
pub struct AggregatedDocument {
    pub text: String,
    /// Mean of the per-page confidences, 0 when there are no pages.
    pub confidence: f64,
    pub page_count: usize,
}

pub fn page_marker(page: usize) -> String {
    format!("--- Page {} ---", page)
}

/// Merge per-page results. Single-page documents are returned unmarked;
/// multi-page documents get a marker header per page.
pub fn aggregate_pages(pages: &[PageRecognition]) -> AggregatedDocument {
    let confidence = if pages.is_empty() {
        0.0
    } else {
        pages.iter().map(|p| p.confidence).sum::<f64>() / pages.len() as f64
    };

    let text = match pages {
        [] => String::new(),
        [only] => only.text.clone(),
        many => many
            .iter()
            .map(|p| format!("{}\n\n{}", page_marker(p.page), p.text))
            .collect::<Vec<_>>()
            .join("\n\n"),
    };

    AggregatedDocument {
        text,
        confidence,
        page_count: pages.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize, text: &str, confidence: f64) -> PageRecognition {
        PageRecognition {
            page: n,
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_single_page_has_no_marker() {
        let doc = aggregate_pages(&[page(1, "chỉ một trang", 92.0)]);
        assert_eq!(doc.text, "chỉ một trang");
        assert_eq!(doc.page_count, 1);
        assert!((doc.confidence - 92.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_multi_page_markers_and_order() {
        let doc = aggregate_pages(&[page(1, "first", 90.0), page(2, "second", 70.0)]);
        assert_eq!(
            doc.text,
            "--- Page 1 ---\n\nfirst\n\n--- Page 2 ---\n\nsecond"
        );
        assert_eq!(doc.page_count, 2);
        assert!((doc.confidence - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_input() {
        let doc = aggregate_pages(&[]);
        assert_eq!(doc.text, "");
        assert_eq!(doc.confidence, 0.0);
        assert_eq!(doc.page_count, 0);
    }
}

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::analyzer::TextAnalyzer;

/// Dense sentence-embedding backend. The core only consumes the numeric
/// vectors; model choice and pooling live behind this seam.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Keyword-extraction backend: top-N salient terms with a weight each.
/// A backend error must propagate as Err, never as a fabricated score.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    async fn extract(&self, text: &str, top_n: usize) -> Result<Vec<(String, f64)>>;
}

/// Cosine similarity between two dense vectors. Zero-norm or mismatched
/// inputs score 0.0 rather than erroring.
pub fn dense_cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Term-frequency keyword extraction over the analyzer's normalized terms.
/// Weights are frequencies scaled by the most frequent term, ties broken
/// alphabetically so output order is deterministic.
pub struct TfKeywordExtractor {
    analyzer: TextAnalyzer,
}

impl TfKeywordExtractor {
    pub fn new(analyzer: TextAnalyzer) -> Self {
        Self { analyzer }
    }

    fn top_terms(&self, text: &str, top_n: usize) -> Vec<(String, f64)> {
        let terms = self.analyzer.analyze(text);
        let mut counts: HashMap<String, usize> = HashMap::new();
        for term in terms {
            *counts.entry(term).or_insert(0) += 1;
        }
        let max_count = counts.values().copied().max().unwrap_or(0);
        if max_count == 0 {
            return vec![];
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(top_n)
            .map(|(term, count)| (term, count as f64 / max_count as f64))
            .collect()
    }
}

impl Default for TfKeywordExtractor {
    fn default() -> Self {
        Self::new(TextAnalyzer::default_pipeline())
    }
}

#[async_trait]
impl KeywordExtractor for TfKeywordExtractor {
    async fn extract(&self, text: &str, top_n: usize) -> Result<Vec<(String, f64)>> {
        Ok(self.top_terms(text, top_n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_cosine_identical_vectors() {
        let v = vec![0.5, 0.5, 0.1];
        let sim = dense_cosine(&v, &v);
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dense_cosine_orthogonal() {
        assert_eq!(dense_cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_dense_cosine_degenerate_inputs() {
        assert_eq!(dense_cosine(&[], &[]), 0.0);
        assert_eq!(dense_cosine(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(dense_cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_tf_extractor_ranks_by_frequency() {
        let extractor = TfKeywordExtractor::default();
        let keywords = extractor
            .extract(
                "tower tower tower bridge bridge museum visiting visiting visiting visiting",
                2,
            )
            .await
            .unwrap();
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].0, "visit"); // stemmed, 4 occurrences
        assert_eq!(keywords[0].1, 1.0);
        assert_eq!(keywords[1].0, "tower");
    }

    #[tokio::test]
    async fn test_tf_extractor_empty_text() {
        let extractor = TfKeywordExtractor::default();
        let keywords = extractor.extract("", 5).await.unwrap();
        assert!(keywords.is_empty());
    }
}

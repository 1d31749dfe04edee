use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::analyzer::TextAnalyzer;
use crate::config::ConfigError;
use crate::data_models::ValidationResult;
use crate::nlp::{Embedder, KeywordExtractor, dense_cosine};

pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.6;
pub const DEFAULT_TOP_N_KEYWORDS: usize = 5;

/// Weights for the composite relevance score. Must sum to 1.0 so the
/// composite stays within [0,1] whenever the sub-scores do.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub cosine: f64,
    pub semantic: f64,
    pub keyword: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            cosine: 0.3,
            semantic: 0.5,
            keyword: 0.2,
        }
    }
}

impl ScoreWeights {
    pub fn new(cosine: f64, semantic: f64, keyword: f64) -> Result<Self, ConfigError> {
        let sum = cosine + semantic + keyword;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError::InvalidWeights { sum });
        }
        Ok(Self {
            cosine,
            semantic,
            keyword,
        })
    }

    pub fn composite(&self, cosine: f64, semantic: f64, keyword: f64) -> f64 {
        cosine * self.cosine + semantic * self.semantic + keyword * self.keyword
    }
}

/// TF-IDF weight vectors for a small corpus, with smoothed IDF
/// (ln((1+n)/(1+df)) + 1) and L2 normalization. Returned vectors are sparse
/// and already unit-length, so cosine similarity reduces to a dot product.
fn tfidf_vectors(docs: &[Vec<String>]) -> Vec<HashMap<String, f64>> {
    let n = docs.len();
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for doc in docs {
        let unique: HashSet<&str> = doc.iter().map(|t| t.as_str()).collect();
        for term in unique {
            *document_frequency.entry(term).or_insert(0) += 1;
        }
    }

    docs.iter()
        .map(|doc| {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for term in doc {
                *counts.entry(term.as_str()).or_insert(0) += 1;
            }

            let mut vector: HashMap<String, f64> = counts
                .into_iter()
                .map(|(term, tf)| {
                    let df = document_frequency[term];
                    let idf = (((1 + n) as f64) / ((1 + df) as f64)).ln() + 1.0;
                    (term.to_string(), tf as f64 * idf)
                })
                .collect();

            let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for weight in vector.values_mut() {
                    *weight /= norm;
                }
            }
            vector
        })
        .collect()
}

fn sparse_dot(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|v| w * v))
        .sum()
}

/// Lexical similarity: TF-IDF over exactly the two-document corpus
/// `[query, text]`, cosine between the two vectors. Degenerate input
/// (either side analyzes to nothing) scores 0.0 instead of erroring.
pub fn tfidf_cosine(analyzer: &TextAnalyzer, query: &str, text: &str) -> f64 {
    let query_terms = analyzer.analyze(query);
    let text_terms = analyzer.analyze(text);
    if query_terms.is_empty() || text_terms.is_empty() {
        return 0.0;
    }
    let vectors = tfidf_vectors(&[query_terms, text_terms]);
    sparse_dot(&vectors[0], &vectors[1])
}

/// Soft, synonym-tolerant key-term coverage: mean TF-IDF cosine between the
/// summary and each key term over the `[summary, term...]` corpus. An empty
/// key-term list is a vacuous pass (exactly 1.0).
pub fn keyword_coverage(analyzer: &TextAnalyzer, summary: &str, key_terms: &[String]) -> f64 {
    if key_terms.is_empty() {
        return 1.0;
    }
    let mut docs = Vec::with_capacity(1 + key_terms.len());
    docs.push(analyzer.analyze(summary));
    for term in key_terms {
        docs.push(analyzer.analyze(term));
    }
    let vectors = tfidf_vectors(&docs);
    let total: f64 = vectors[1..]
        .iter()
        .map(|term_vec| sparse_dot(&vectors[0], term_vec))
        .sum();
    total / key_terms.len() as f64
}

/// Longest matching block between `a[alo..ahi]` and `b[blo..bhi]`.
fn find_longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0usize);
    // j2len[j] = length of the match ending at a[i-1], b[j-1]
    let mut j2len = vec![0usize; b.len() + 1];
    for i in alo..ahi {
        let mut row = vec![0usize; b.len() + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = if j > blo { j2len[j - 1] } else { 0 } + 1;
                row[j] = k;
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = row;
    }
    (best_i, best_j, best_size)
}

fn match_count(a: &[char], b: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> usize {
    let (i, j, k) = find_longest_match(a, b, alo, ahi, blo, bhi);
    if k == 0 {
        return 0;
    }
    k + match_count(a, b, alo, i, blo, j) + match_count(a, b, i + k, ahi, j + k, bhi)
}

/// Order-sensitive character-level similarity in [0,1]
/// (Ratcliff/Obershelp: 2*M / (len(a)+len(b))). Two empty strings are a
/// perfect match.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() && b_chars.is_empty() {
        return 1.0;
    }
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }
    let matches = match_count(&a_chars, &b_chars, 0, a_chars.len(), 0, b_chars.len());
    2.0 * matches as f64 / (a_chars.len() + b_chars.len()) as f64
}

/// Multi-signal relevance scorer combining lexical TF-IDF cosine, dense
/// embedding similarity, and keyword overlap into one weighted composite.
pub struct RelevanceScorer {
    analyzer: TextAnalyzer,
    embedder: Arc<dyn Embedder>,
    keywords: Arc<dyn KeywordExtractor>,
    weights: ScoreWeights,
    threshold: f64,
    top_n: usize,
}

impl RelevanceScorer {
    pub fn new(embedder: Arc<dyn Embedder>, keywords: Arc<dyn KeywordExtractor>) -> Self {
        Self {
            analyzer: TextAnalyzer::default_pipeline(),
            embedder,
            keywords,
            weights: ScoreWeights::default(),
            threshold: DEFAULT_SCORE_THRESHOLD,
            top_n: DEFAULT_TOP_N_KEYWORDS,
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn analyzer(&self) -> &TextAnalyzer {
        &self.analyzer
    }

    /// Overlap of the top-N keywords extracted independently from query and
    /// text: |intersection| / |query keywords|. A query with no extractable
    /// keywords is a vacuous pass (1.0), not a failure.
    async fn keyword_overlap_score(&self, query: &str, text: &str) -> Result<f64> {
        let query_keywords = self.keywords.extract(query, self.top_n).await?;
        if query_keywords.is_empty() {
            return Ok(1.0);
        }
        let text_keywords: HashSet<String> = self
            .keywords
            .extract(text, self.top_n)
            .await?
            .into_iter()
            .map(|(term, _)| term)
            .collect();

        let overlap = query_keywords
            .iter()
            .filter(|(term, _)| text_keywords.contains(term))
            .count();
        Ok(overlap as f64 / query_keywords.len() as f64)
    }

    /// Embedding cosine clamped into [0,1]; raw cosine can go negative and
    /// would otherwise drag the composite out of range.
    async fn semantic_score(&self, query: &str, text: &str) -> Result<f64> {
        let query_embedding = self.embedder.embed(query).await?;
        let text_embedding = self.embedder.embed(text).await?;
        Ok(dense_cosine(&query_embedding, &text_embedding).clamp(0.0, 1.0))
    }

    /// Scores `text` against `query` along all three signals. Backend errors
    /// (embedding, keyword extraction) propagate; the caller decides whether
    /// that means retry or abort.
    pub async fn score(&self, query: &str, text: &str) -> Result<ValidationResult> {
        let cosine_score = tfidf_cosine(&self.analyzer, query, text);
        let semantic_score = self.semantic_score(query, text).await?;
        let keyword_score = self.keyword_overlap_score(query, text).await?;

        let score = self
            .weights
            .composite(cosine_score, semantic_score, keyword_score);
        let is_valid = score >= self.threshold;

        log::debug!(
            "scored result: composite={score:.3} cosine={cosine_score:.3} \
             semantic={semantic_score:.3} keyword={keyword_score:.3}"
        );

        Ok(ValidationResult {
            score,
            is_valid,
            cosine_score,
            semantic_score,
            keyword_score,
            reason: if is_valid {
                "Meets relevance threshold".to_string()
            } else {
                "Below relevance threshold".to_string()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::TfKeywordExtractor;
    use async_trait::async_trait;

    struct FixedEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.vector.clone())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            anyhow::bail!("embedding backend unavailable")
        }
    }

    fn scorer_with_fixed_embedding() -> RelevanceScorer {
        RelevanceScorer::new(
            Arc::new(FixedEmbedder {
                vector: vec![1.0, 0.0, 0.0],
            }),
            Arc::new(TfKeywordExtractor::default()),
        )
    }

    #[test]
    fn test_tfidf_cosine_identical_texts() {
        let analyzer = TextAnalyzer::default_pipeline();
        let sim = tfidf_cosine(&analyzer, "eiffel tower paris", "eiffel tower paris");
        assert!((sim - 1.0).abs() < 1e-9, "expected 1.0, got {sim}");
    }

    #[test]
    fn test_tfidf_cosine_disjoint_texts() {
        let analyzer = TextAnalyzer::default_pipeline();
        let sim = tfidf_cosine(&analyzer, "eiffel tower", "quantum computing");
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_tfidf_cosine_empty_input_does_not_panic() {
        let analyzer = TextAnalyzer::default_pipeline();
        assert_eq!(tfidf_cosine(&analyzer, "", "eiffel tower"), 0.0);
        assert_eq!(tfidf_cosine(&analyzer, "eiffel tower", ""), 0.0);
        assert_eq!(tfidf_cosine(&analyzer, "", ""), 0.0);
    }

    #[test]
    fn test_tfidf_cosine_partial_overlap_in_unit_range() {
        let analyzer = TextAnalyzer::default_pipeline();
        let sim = tfidf_cosine(
            &analyzer,
            "landmarks in paris",
            "the eiffel tower is the most famous landmark of paris",
        );
        assert!(sim > 0.0 && sim < 1.0, "got {sim}");
    }

    #[test]
    fn test_keyword_coverage_vacuous_pass() {
        let analyzer = TextAnalyzer::default_pipeline();
        assert_eq!(keyword_coverage(&analyzer, "any summary text", &[]), 1.0);
    }

    #[test]
    fn test_keyword_coverage_covered_terms() {
        let analyzer = TextAnalyzer::default_pipeline();
        let covered = keyword_coverage(
            &analyzer,
            "the eiffel tower dominates the paris skyline",
            &["eiffel".to_string(), "paris".to_string()],
        );
        let uncovered = keyword_coverage(
            &analyzer,
            "the eiffel tower dominates the paris skyline",
            &["volcano".to_string(), "glacier".to_string()],
        );
        assert!(covered > uncovered);
        assert_eq!(uncovered, 0.0);
    }

    #[test]
    fn test_sequence_ratio_bounds() {
        assert_eq!(sequence_ratio("", ""), 1.0);
        assert_eq!(sequence_ratio("abc", ""), 0.0);
        assert!((sequence_ratio("abcd", "abcd") - 1.0).abs() < 1e-9);
        let ratio = sequence_ratio("abcd", "bcde");
        assert!(ratio > 0.0 && ratio < 1.0);
    }

    #[test]
    fn test_sequence_ratio_known_value() {
        // "abcd" vs "abxcd" match on "ab" and "cd": M=4, T=4+5
        let ratio = sequence_ratio("abcd", "abxcd");
        assert!((ratio - (2.0 * 4.0 / 9.0)).abs() < 1e-9);
    }

    #[test]
    fn test_score_weights_must_sum_to_one() {
        assert!(ScoreWeights::new(0.3, 0.5, 0.2).is_ok());
        assert!(ScoreWeights::new(0.5, 0.5, 0.5).is_err());
    }

    #[tokio::test]
    async fn test_composite_within_bounds() {
        let scorer = scorer_with_fixed_embedding();
        let result = scorer
            .score("landmarks in paris", "the eiffel tower is in paris")
            .await
            .unwrap();
        assert!(result.score >= 0.0 && result.score <= 1.0);
        assert!(result.cosine_score >= 0.0 && result.cosine_score <= 1.0);
        assert!(result.semantic_score >= 0.0 && result.semantic_score <= 1.0);
        assert!(result.keyword_score >= 0.0 && result.keyword_score <= 1.0);
    }

    #[tokio::test]
    async fn test_score_reason_tracks_threshold() {
        let scorer = scorer_with_fixed_embedding().with_threshold(0.99);
        let result = scorer.score("paris", "tokyo skyline").await.unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.reason, "Below relevance threshold");
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let scorer = RelevanceScorer::new(
            Arc::new(FailingEmbedder),
            Arc::new(TfKeywordExtractor::default()),
        );
        assert!(scorer.score("paris", "eiffel tower").await.is_err());
    }
}

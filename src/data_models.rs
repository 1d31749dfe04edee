use serde::{Deserialize, Serialize};

/// One search hit as returned by the search provider. Immutable once built;
/// ordering of results stays exactly as the provider ranked them.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RawResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub engines: Vec<String>,
    pub category: String,
}

impl RawResult {
    pub fn new(title: String, link: String, snippet: String) -> RawResult {
        RawResult {
            title,
            link,
            snippet,
            engines: vec![],
            category: String::new(),
        }
    }
}

/// Multi-signal relevance verdict for a single result. Produced by the
/// relevance scorer and consumed immediately by the result validator.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ValidationResult {
    pub score: f64,
    pub is_valid: bool,
    pub cosine_score: f64,
    pub semantic_score: f64,
    pub keyword_score: f64,
    pub reason: String,
}

/// Aggregate of one search invocation. `validation_results` is index-aligned
/// with `web_results`; downstream stages treat this as read-only.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchResponse {
    pub search_term: String,
    pub web_results: Vec<String>,
    pub validation_results: Vec<ValidationResult>,
    pub all_results: Vec<RawResult>,
}

/// Verdict for one summarization attempt. Ephemeral, only lives inside the
/// summary validation retry loop and the final report.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SummaryValidation {
    pub score: f64,
    pub is_valid: bool,
    pub reason: String,
}

/// A works-cited entry derived from `all_results`, order preserved.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub title: String,
    pub link: String,
}

/// What a generated summary is expected to satisfy. Key terms are extracted
/// once from the source text and reused unchanged across regeneration
/// attempts.
#[derive(Debug, Clone)]
pub struct SummaryExpectations {
    pub min_word_count: usize,
    pub threshold: f64,
    pub key_terms: Vec<String>,
}

impl SummaryExpectations {
    pub fn new(key_terms: Vec<String>) -> SummaryExpectations {
        SummaryExpectations {
            min_word_count: 30,
            threshold: 0.5,
            key_terms,
        }
    }
}

use anyhow::Result;
use std::sync::Arc;

use crate::analyzer::TextAnalyzer;
use crate::data_models::{SearchResponse, SummaryExpectations, SummaryValidation};
use crate::llm::TextGenerator;
use crate::nlp::KeywordExtractor;
use crate::scoring::{keyword_coverage, sequence_ratio};

pub const DEFAULT_MAX_SUMMARY_ATTEMPTS: usize = 3;

/// Filters a search response down to the snippets whose aligned validation
/// verdict passed.
///
/// Policy corner cases:
/// - zero results in and zero verdicts in gives zero results out;
/// - a length mismatch between results and verdicts is an integration bug
///   and fails closed to empty rather than guessing an alignment;
/// - if every verdict failed, the original unfiltered list is returned:
///   over-inclusion beats starving the summarizer.
pub fn validate_search_results(response: &SearchResponse) -> Vec<String> {
    if response.web_results.len() != response.validation_results.len() {
        log::warn!(
            "mismatched results ({}) and validations ({}), discarding all",
            response.web_results.len(),
            response.validation_results.len()
        );
        return vec![];
    }

    let validated: Vec<String> = response
        .web_results
        .iter()
        .zip(response.validation_results.iter())
        .filter(|(_, validation)| validation.is_valid)
        .map(|(result, _)| result.clone())
        .collect();

    if validated.is_empty() && !response.web_results.is_empty() {
        log::warn!(
            "no results passed validation for '{}', falling back to unfiltered set",
            response.search_term
        );
        return response.web_results.clone();
    }

    validated
}

/// Scores a generated summary against its source text, regenerating up to a
/// bounded number of attempts when the composite falls short.
pub struct SummaryValidator {
    analyzer: TextAnalyzer,
    keywords: Arc<dyn KeywordExtractor>,
    max_attempts: usize,
}

impl SummaryValidator {
    pub fn new(keywords: Arc<dyn KeywordExtractor>) -> Self {
        Self {
            analyzer: TextAnalyzer::default_pipeline(),
            keywords,
            max_attempts: DEFAULT_MAX_SUMMARY_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Default expectations for a summary of `source_text`: a floor on word
    /// count, the 0.5 composite threshold, and the source's top five key
    /// terms.
    pub async fn default_expectations(&self, source_text: &str) -> Result<SummaryExpectations> {
        let key_terms = self
            .keywords
            .extract(source_text, 5)
            .await?
            .into_iter()
            .map(|(term, _)| term)
            .collect();
        Ok(SummaryExpectations::new(key_terms))
    }

    fn score_attempt(&self, summary: &str, source_text: &str, key_terms: &[String]) -> f64 {
        let coverage = keyword_coverage(&self.analyzer, summary, key_terms);
        let relevance = sequence_ratio(summary, source_text);
        coverage * 0.5 + relevance * 0.5
    }

    /// Validates `summary` against `source_text`, regenerating through
    /// `generator` while attempts remain and the composite misses the
    /// threshold. Key terms are computed once and reused verbatim across
    /// attempts. Returns the final summary (possibly regenerated) together
    /// with its verdict.
    ///
    /// A summary below the word-count floor fails immediately without
    /// burning retries: regeneration is driven by relevance, and an
    /// undersized summary would fail the same way every time.
    pub async fn validate(
        &self,
        generator: &dyn TextGenerator,
        summary: String,
        source_text: &str,
        expectations: Option<SummaryExpectations>,
    ) -> Result<(String, SummaryValidation)> {
        let expectations = match expectations {
            Some(expectations) => expectations,
            None => self.default_expectations(source_text).await?,
        };

        let mut summary = summary;
        let mut last_score = 0.0;

        for attempt in 1..=self.max_attempts {
            let word_count = summary.split_whitespace().count();
            if word_count < expectations.min_word_count {
                log::warn!(
                    "summary rejected: {} words, expected at least {}",
                    word_count,
                    expectations.min_word_count
                );
                return Ok((
                    summary,
                    SummaryValidation {
                        score: 0.0,
                        is_valid: false,
                        reason: "Summary is too short".to_string(),
                    },
                ));
            }

            last_score = self.score_attempt(&summary, source_text, &expectations.key_terms);
            log::info!(
                "summary validation attempt {attempt}/{}: score = {last_score:.3}",
                self.max_attempts
            );

            if last_score >= expectations.threshold {
                return Ok((
                    summary,
                    SummaryValidation {
                        score: last_score,
                        is_valid: true,
                        reason: "Summary meets expectations".to_string(),
                    },
                ));
            }

            if attempt < self.max_attempts {
                summary = generator.summarize(source_text).await?;
            }
        }

        Ok((
            summary,
            SummaryValidation {
                score: last_score,
                is_valid: false,
                reason: "Summary did not meet relevance threshold after max retries".to_string(),
            },
        ))
    }
}

use anyhow::Result;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::admission::{AdmissionDecision, QueryAdmissionFilter};
use crate::data_models::{Citation, RawResult, SearchResponse, SummaryValidation};
use crate::document::{Document, DocumentError, DocumentSink};
use crate::llm::TextGenerator;
use crate::scoring::RelevanceScorer;
use crate::search::SearchProvider;
use crate::validator::{SummaryValidator, validate_search_results};

pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Literal marker some providers embed in an otherwise well-formed response.
const NO_RESULTS_MARKER: &str = "No results found";

/// Why a run stopped before producing a report. Each short-circuit point
/// keeps its own variant; an operator needs to tell "no search results"
/// apart from "summarization failed".
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("query rejected: {reason}")]
    QueryRejected { reason: String },
    #[error("failed to fetch search results after retries")]
    FetchFailed,
    #[error("no valid results to process for summarization")]
    NoUsableResults,
    #[error("summary generation failed")]
    SummarizationFailed,
}

/// What a completed run hands back to the operator. The summary is surfaced
/// even when validation failed so a human can judge a low-confidence result;
/// a save failure is terminal for the run but reported apart from upstream
/// content failures.
#[derive(Debug)]
pub struct PipelineReport {
    pub search_term: String,
    pub summary: String,
    pub validation: SummaryValidation,
    pub citations: Vec<Citation>,
    pub document_path: Option<PathBuf>,
    pub save_error: Option<DocumentError>,
}

/// Marks a stage result as usable or as a retryable failure value.
pub trait RetryOutcome {
    fn is_usable(&self) -> bool;
}

impl RetryOutcome for String {
    fn is_usable(&self) -> bool {
        !self.trim().is_empty() && !self.contains(NO_RESULTS_MARKER)
    }
}

impl RetryOutcome for SearchResponse {
    fn is_usable(&self) -> bool {
        !self.web_results.is_empty()
            && !self
                .web_results
                .iter()
                .any(|r| r.contains(NO_RESULTS_MARKER))
    }
}

/// Runs `operation` until it yields a usable result, up to `max_retries`
/// sequential attempts. Exhaustion is a value (`None`), never a panic or an
/// error: the caller decides what total failure means for its stage.
pub async fn retry_with_validation<T, F, Fut>(mut operation: F, max_retries: usize) -> Option<T>
where
    T: RetryOutcome,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=max_retries {
        log::info!("Attempt {attempt} of {max_retries}");
        match operation().await {
            Ok(result) if result.is_usable() => {
                log::info!("Validation succeeded.");
                return Some(result);
            }
            Ok(_) => {
                log::warn!("Validation failed on attempt {attempt}. Retrying...");
            }
            Err(e) => {
                log::warn!("Operation failed on attempt {attempt}: {e:#}. Retrying...");
            }
        }
    }
    log::error!("All retries exhausted. Validation failed.");
    None
}

/// Works-cited entries from the full (unvalidated) result set, provider
/// order preserved. Entries without a usable snippet are dropped; missing
/// titles and links get placeholder text rather than empty strings.
pub fn extract_citations(all_results: &[RawResult]) -> Vec<Citation> {
    all_results
        .iter()
        .filter(|entry| !entry.snippet.trim().is_empty())
        .map(|entry| Citation {
            title: if entry.title.is_empty() {
                "No Title".to_string()
            } else {
                entry.title.clone()
            },
            link: if entry.link.is_empty() {
                "No Link".to_string()
            } else {
                entry.link.clone()
            },
        })
        .collect()
}

/// Concatenates validated snippets into the text handed to the summarizer.
pub fn process_results(snippets: &[String]) -> String {
    snippets.join("\n\n")
}

fn create_search_term(user_input: &str) -> String {
    user_input.trim().to_lowercase()
}

/// The pipeline driver: admission gate, fetch with retry, result
/// validation, summarization, summary validation, citation extraction,
/// persistence. Single-flow and synchronous per query; one instance per
/// composition root, collaborators injected explicitly.
pub struct Pipeline {
    admission: QueryAdmissionFilter,
    provider: Arc<dyn SearchProvider>,
    generator: Arc<dyn TextGenerator>,
    scorer: RelevanceScorer,
    summary_validator: SummaryValidator,
    sink: Arc<dyn DocumentSink>,
    max_retries: usize,
    output_filename: String,
}

impl Pipeline {
    pub fn new(
        admission: QueryAdmissionFilter,
        provider: Arc<dyn SearchProvider>,
        generator: Arc<dyn TextGenerator>,
        scorer: RelevanceScorer,
        summary_validator: SummaryValidator,
        sink: Arc<dyn DocumentSink>,
    ) -> Self {
        Self {
            admission,
            provider,
            generator,
            scorer,
            summary_validator,
            sink,
            max_retries: DEFAULT_MAX_RETRIES,
            output_filename: "pipeline_output.md".to_string(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_output_filename(mut self, filename: impl Into<String>) -> Self {
        self.output_filename = filename.into();
        self
    }

    /// One provider call plus per-result relevance scoring. A provider
    /// network error or a scoring-backend error both fail the attempt; the
    /// retry loop treats them as the same transient class.
    async fn fetch_and_score(&self, search_term: &str) -> Result<SearchResponse> {
        let all_results = self.provider.search(search_term).await?;

        let mut web_results = Vec::with_capacity(all_results.len());
        let mut validation_results = Vec::with_capacity(all_results.len());
        for result in &all_results {
            let verdict = self.scorer.score(search_term, &result.snippet).await?;
            web_results.push(result.snippet.clone());
            validation_results.push(verdict);
        }

        Ok(SearchResponse {
            search_term: search_term.to_string(),
            web_results,
            validation_results,
            all_results,
        })
    }

    pub async fn run(&self, user_input: &str) -> Result<PipelineReport, PipelineError> {
        // Step 0: admission gate on the raw query
        if let AdmissionDecision::Rejected { reason } = self.admission.decide(user_input).await {
            log::warn!("query '{user_input}' not admitted: {reason}");
            return Err(PipelineError::QueryRejected { reason });
        }

        let search_term = create_search_term(user_input);

        // Step 1: fetch and score web results with the retry mechanism
        let response = retry_with_validation(|| self.fetch_and_score(&search_term), self.max_retries)
            .await
            .ok_or_else(|| {
                log::error!("Failed to fetch search results after retries.");
                PipelineError::FetchFailed
            })?;

        // Step 2: validate and process the fetched results
        let validated_results = validate_search_results(&response);
        if validated_results.is_empty() {
            log::error!("No valid results to process for summarization.");
            return Err(PipelineError::NoUsableResults);
        }
        let results_text = process_results(&validated_results);

        // Step 3: summarize the validated results
        let summary = match self.generator.summarize(&results_text).await {
            Ok(summary) if RetryOutcome::is_usable(&summary) => summary,
            Ok(_) => {
                log::error!("Summary generation returned no usable text.");
                return Err(PipelineError::SummarizationFailed);
            }
            Err(e) => {
                log::error!("Summary generation failed: {e:#}");
                return Err(PipelineError::SummarizationFailed);
            }
        };

        // Step 3.5: score the summary, regenerating if it falls short.
        // A quality failure is a verdict, not an error: the summary is still
        // surfaced so a human can judge the low-confidence result.
        let (summary, validation) = match self
            .summary_validator
            .validate(
                self.generator.as_ref(),
                summary.clone(),
                &results_text,
                None,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Error during summary validation: {e:#}");
                (
                    summary,
                    SummaryValidation {
                        score: 0.0,
                        is_valid: false,
                        reason: format!("Error during summary validation: {e}"),
                    },
                )
            }
        };

        if validation.is_valid {
            log::info!("Summary validation succeeded.");
        } else {
            log::warn!("Summary validation failed: {}", validation.reason);
        }

        // Step 4: extract works cited from the full result set
        let citations = extract_citations(&response.all_results);

        // Step 5: persist; save failures are terminal for the run but never
        // unwind the pipeline
        let document = Document::new(user_input.to_string(), summary.clone(), citations.clone())
            .with_validated(validation.is_valid);
        let (document_path, save_error) =
            match self.sink.save(&self.output_filename, &document).await {
                Ok(path) => {
                    log::info!("Document successfully saved.");
                    (Some(path), None)
                }
                Err(e) => {
                    log::error!("Failed to save the document: {e}");
                    (None, Some(e))
                }
            };

        Ok(PipelineReport {
            search_term,
            summary,
            validation,
            citations,
            document_path,
            save_error,
        })
    }
}

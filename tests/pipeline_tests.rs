use anyhow::Result;
use std::sync::Arc;

use distill::admission::QueryAdmissionFilter;
use distill::data_models::RawResult;
use distill::document::{Document, DocumentError, DocumentSink};
use distill::llm::TextGenerator;
use distill::nlp::{Embedder, TfKeywordExtractor};
use distill::pipeline::{Pipeline, PipelineError};
use distill::scoring::RelevanceScorer;
use distill::search::{SearchError, SearchProvider};
use distill::validator::SummaryValidator;

mod test_helpers {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds everything onto the same unit vector so category similarity
    /// and semantic relevance both score 1.0.
    pub struct AgreeableEmbedder;

    #[async_trait]
    impl Embedder for AgreeableEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Returns a fixed result set on every call and counts invocations.
    pub struct StaticSearchProvider {
        results: Vec<RawResult>,
        pub calls: AtomicUsize,
    }

    impl StaticSearchProvider {
        pub fn new(results: Vec<RawResult>) -> Self {
            Self {
                results,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for StaticSearchProvider {
        async fn search(&self, _query: &str) -> Result<Vec<RawResult>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.results.clone())
        }
    }

    /// Echoes the text portion of the summarization prompt back verbatim.
    pub struct EchoGenerator {
        pub calls: AtomicUsize,
    }

    impl EchoGenerator {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = prompt
                .split_once("\n\n")
                .map(|(_, body)| body)
                .unwrap_or(prompt);
            Ok(text.to_string())
        }
    }

    /// Records saves in memory instead of touching the filesystem.
    pub struct MemorySink {
        pub saves: AtomicUsize,
        pub last_body: Mutex<Option<String>>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self {
                saves: AtomicUsize::new(0),
                last_body: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl DocumentSink for MemorySink {
        async fn save(
            &self,
            filename: &str,
            document: &Document,
        ) -> Result<PathBuf, DocumentError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.last_body.lock().unwrap() = Some(document.render());
            Ok(PathBuf::from(filename))
        }
    }

    pub fn paris_results() -> Vec<RawResult> {
        vec![
            RawResult::new(
                "Eiffel Tower".to_string(),
                "https://example.com/eiffel".to_string(),
                "The Eiffel Tower is the most famous landmark in Paris; every landmark \
                 map of Paris starts with this iron tower."
                    .to_string(),
            ),
            RawResult::new(
                "Louvre Museum".to_string(),
                "https://example.com/louvre".to_string(),
                "The Louvre is a Paris landmark near another Paris landmark, the \
                 Tuileries garden, and houses the Mona Lisa."
                    .to_string(),
            ),
            RawResult::new(
                "Notre-Dame".to_string(),
                "https://example.com/notre-dame".to_string(),
                "Notre-Dame remains a cherished landmark of Paris, a landmark Paris \
                 has carefully restored since the fire."
                    .to_string(),
            ),
        ]
    }

    pub fn build_pipeline(
        provider: Arc<StaticSearchProvider>,
        generator: Arc<EchoGenerator>,
        sink: Arc<MemorySink>,
        goals: Vec<String>,
    ) -> Pipeline {
        let embedder = Arc::new(AgreeableEmbedder);
        let keywords = Arc::new(TfKeywordExtractor::default());
        Pipeline::new(
            QueryAdmissionFilter::new(embedder.clone()).with_goals(goals),
            provider,
            generator,
            RelevanceScorer::new(embedder, keywords.clone()),
            SummaryValidator::new(keywords),
            sink,
        )
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_pipeline_end_to_end_produces_validated_document() -> Result<()> {
    let provider = Arc::new(StaticSearchProvider::new(paris_results()));
    let generator = Arc::new(EchoGenerator::new());
    let sink = Arc::new(MemorySink::new());
    let pipeline = build_pipeline(
        provider.clone(),
        generator.clone(),
        sink.clone(),
        vec!["paris".to_string()],
    );

    let report = pipeline.run("landmarks in Paris").await.unwrap();

    assert_eq!(report.search_term, "landmarks in paris");
    assert!(
        report.validation.is_valid,
        "echoed summary should pass validation, got: {}",
        report.validation.reason
    );
    assert!(report.summary.contains("Eiffel Tower"));
    assert!(report.summary.contains("Louvre"));
    assert_eq!(report.citations.len(), 3);
    assert_eq!(report.citations[0].title, "Eiffel Tower");
    assert!(report.save_error.is_none());
    assert!(report.document_path.is_some());

    // One fetch, one summarization, one save.
    assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(generator.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(sink.saves.load(std::sync::atomic::Ordering::SeqCst), 1);

    let body = sink.last_body.lock().unwrap().clone().unwrap();
    assert!(
        body.starts_with("# Summary of landmarks in Paris\n\n"),
        "document body should open with the topic header"
    );
    assert!(body.contains("## Works Cited\n"));
    assert!(body.contains("- Eiffel Tower: https://example.com/eiffel\n"));
    assert!(body.contains("- Louvre Museum: https://example.com/louvre\n"));
    assert!(body.contains("- Notre-Dame: https://example.com/notre-dame\n"));
    Ok(())
}

#[tokio::test]
async fn test_pipeline_empty_results_exhaust_retries_without_saving() -> Result<()> {
    let provider = Arc::new(StaticSearchProvider::new(vec![]));
    let generator = Arc::new(EchoGenerator::new());
    let sink = Arc::new(MemorySink::new());
    let pipeline = build_pipeline(
        provider.clone(),
        generator.clone(),
        sink.clone(),
        vec!["news".to_string()],
    );

    let err = pipeline.run("latest news about rust").await.unwrap_err();
    assert!(matches!(err, PipelineError::FetchFailed));

    // The fetch stage retries up to its cap; nothing downstream runs.
    assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    assert_eq!(generator.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(sink.saves.load(std::sync::atomic::Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_rejects_noise_query_before_fetching() -> Result<()> {
    let provider = Arc::new(StaticSearchProvider::new(paris_results()));
    let generator = Arc::new(EchoGenerator::new());
    let sink = Arc::new(MemorySink::new());
    let pipeline = build_pipeline(
        provider.clone(),
        generator.clone(),
        sink.clone(),
        vec!["paris".to_string()],
    );

    let err = pipeline.run("@#$%^&*()").await.unwrap_err();
    match err {
        PipelineError::QueryRejected { reason } => {
            assert_eq!(reason, "Query does not have relationship to categories");
        }
        other => panic!("expected query rejection, got {:?}", other),
    }
    assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(sink.saves.load(std::sync::atomic::Ordering::SeqCst), 0);
    Ok(())
}

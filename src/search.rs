use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::data_models::RawResult;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Provider unreachable or timed out; the transient class the retry
    /// loop is allowed to consume.
    #[error("network error during search execution: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to parse search results: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The opaque search transport. Returns provider-ranked result snippets;
/// the core never re-orders them.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<RawResult>, SearchError>;
}

/// Wire shape of one SearxNG hit; only the fields the pipeline consumes.
#[derive(Debug, Deserialize)]
struct SearxResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    engines: Vec<String>,
    #[serde(default)]
    category: String,
}

#[derive(Debug, Deserialize)]
struct SearxResponse {
    #[serde(default)]
    results: Vec<SearxResult>,
}

/// Client for a SearxNG instance's JSON API.
pub struct SearxClient {
    client: reqwest::Client,
    host: String,
    result_count: usize,
}

impl SearxClient {
    pub fn new(host: impl Into<String>, result_count: usize) -> Self {
        log::info!("SearxNG search engine client initialized");
        Self {
            client: reqwest::Client::new(),
            host: host.into(),
            result_count,
        }
    }
}

#[async_trait]
impl SearchProvider for SearxClient {
    async fn search(&self, query: &str) -> Result<Vec<RawResult>, SearchError> {
        let url = format!("{}/search", self.host.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("q", query), ("format", "json"), ("language", "en-us")])
            .send()
            .await?
            .error_for_status()?
            .json::<SearxResponse>()
            .await?;

        log::info!(
            "search executed successfully: {} raw results for '{query}'",
            response.results.len()
        );

        Ok(response
            .results
            .into_iter()
            .take(self.result_count)
            .map(|r| RawResult {
                title: r.title,
                link: r.url,
                snippet: r.content,
                engines: r.engines,
                category: r.category,
            })
            .collect())
    }
}

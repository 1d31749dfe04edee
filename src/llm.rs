use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::{CONFIG, ConfigError};
use crate::nlp::Embedder;

/// The opaque prompt-to-text backend. `summarize` is the one prompt shape
/// the pipeline owns.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    async fn summarize(&self, text: &str) -> Result<String> {
        let prompt = format!("Summarize the following:\n\n{text}");
        self.generate(&prompt).await
    }
}

/// Closed set of supported generation backends. An unknown name is a
/// configuration error at construction time, not a call-time surprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    Gemini,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// One generation client per process, constructed at the composition root
/// and passed down explicitly.
pub enum LlmClient {
    Ollama(OllamaClient),
    Gemini(GeminiClient),
}

impl LlmClient {
    pub fn from_config(kind: ProviderKind) -> Result<Self, ConfigError> {
        match kind {
            ProviderKind::Ollama => Ok(LlmClient::Ollama(OllamaClient::new(
                &CONFIG.ollama_url,
                &CONFIG.ollama_model,
                &CONFIG.ollama_embed_model,
            ))),
            ProviderKind::Gemini => {
                let api_key = CONFIG
                    .gemini_api_key
                    .clone()
                    .ok_or(ConfigError::MissingEnv("GEMINI_KEY"))?;
                Ok(LlmClient::Gemini(GeminiClient::new(
                    api_key,
                    &CONFIG.gemini_model,
                )))
            }
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            LlmClient::Ollama(client) => client.generate(prompt).await,
            LlmClient::Gemini(client) => client.generate(prompt).await,
        }
    }
}

/// Client for a local Ollama instance. Serves both text generation and the
/// embedding backend consumed by the scorers.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    embed_model: String,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        embed_model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            embed_model: embed_model.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct GenerateReq<'a> {
            model: &'a str,
            prompt: &'a str,
            stream: bool,
        }

        #[derive(Deserialize)]
        struct GenerateResp {
            response: String,
        }

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&GenerateReq {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .context("failed to call ollama generate endpoint")?
            .error_for_status()
            .context("ollama generate returned non-success status")?
            .json::<GenerateResp>()
            .await
            .context("failed to decode ollama generate response")?;

        Ok(response.response.trim().to_string())
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbeddingReq<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbeddingResp {
            embedding: Vec<f32>,
        }

        let input = text.trim();
        if input.is_empty() {
            anyhow::bail!("cannot embed empty text input");
        }

        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&EmbeddingReq {
                model: &self.embed_model,
                prompt: input,
            })
            .send()
            .await
            .context("failed to call ollama embeddings endpoint")?
            .error_for_status()
            .context("ollama embeddings returned non-success status")?
            .json::<EmbeddingResp>()
            .await
            .context("failed to decode ollama embeddings response")?;

        Ok(response.embedding)
    }
}

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Gemini generateContent API.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }

        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }

        #[derive(Serialize)]
        struct GenerateReq<'a> {
            contents: Vec<Content<'a>>,
        }

        #[derive(Deserialize)]
        struct RespPart {
            text: String,
        }

        #[derive(Deserialize)]
        struct RespContent {
            parts: Vec<RespPart>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: RespContent,
        }

        #[derive(Deserialize)]
        struct GenerateResp {
            candidates: Vec<Candidate>,
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self
            .client
            .post(url)
            .json(&GenerateReq {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            })
            .send()
            .await
            .context("failed to call gemini generateContent endpoint")?
            .error_for_status()
            .context("gemini generateContent returned non-success status")?
            .json::<GenerateResp>()
            .await
            .context("failed to decode gemini response")?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("gemini returned no candidates"))?;

        Ok(text)
    }
}

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported model name '{0}'. Choose 'gemini' or 'ollama'")]
    UnsupportedProvider(String),
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),
    #[error("relevance weights must sum to 1.0, got {sum}")]
    InvalidWeights { sum: f64 },
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        searx_url: get_env_or_default("SEARX_URL", "http://localhost:8080"),
        search_result_count: get_env_or_default("SEARCH_RESULT_COUNT", "3")
            .parse()
            .unwrap_or(3),
        llm_provider: get_env_or_default("LLM_PROVIDER", "ollama"),
        ollama_url: get_env_or_default("OLLAMA_URL", "http://localhost:11434"),
        ollama_model: get_env_or_default("OLLAMA_MODEL", "llama3.2:latest"),
        ollama_embed_model: get_env_or_default("OLLAMA_EMBED_MODEL", "nomic-embed-text"),
        gemini_api_key: env::var("GEMINI_KEY").ok(),
        gemini_model: get_env_or_default("GEMINI_MODEL", "gemini-1.5-flash"),
        max_retries: get_env_or_default("MAX_FETCH_RETRIES", "3").parse().unwrap_or(3),
        output_dir: get_env_or_default("OUTPUT_DIR", "."),
    }
});

pub struct Config {
    pub searx_url: String,
    pub search_result_count: usize,
    pub llm_provider: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_embed_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub max_retries: usize,
    pub output_dir: String,
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

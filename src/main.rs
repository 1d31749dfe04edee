use anyhow::Result;
use clap::Parser;
use std::str::FromStr;
use std::sync::Arc;

use distill::admission::QueryAdmissionFilter;
use distill::config::CONFIG;
use distill::document::FileSink;
use distill::llm::{LlmClient, OllamaClient, ProviderKind};
use distill::nlp::TfKeywordExtractor;
use distill::pipeline::Pipeline;
use distill::scoring::RelevanceScorer;
use distill::search::SearxClient;
use distill::validator::SummaryValidator;

/// Searches the web for a topic, distills the results into a validated
/// summary, and saves it as a markdown document with citations.
#[derive(Parser, Debug)]
#[command(name = "distill", version, about)]
struct Args {
    /// Topic to search for and summarize
    query: String,

    /// Generation backend: 'ollama' or 'gemini' (overrides LLM_PROVIDER)
    #[arg(long)]
    provider: Option<String>,

    /// Output filename, must end in .md
    #[arg(long, default_value = "pipeline_output.md")]
    output: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let args = Args::parse();

    let provider_name = args.provider.as_deref().unwrap_or(&CONFIG.llm_provider);
    let kind = ProviderKind::from_str(provider_name)?;
    let generator = Arc::new(LlmClient::from_config(kind)?);

    // Ollama serves embeddings regardless of which backend generates text.
    let embedder = Arc::new(OllamaClient::new(
        &CONFIG.ollama_url,
        &CONFIG.ollama_model,
        &CONFIG.ollama_embed_model,
    ));
    let keywords = Arc::new(TfKeywordExtractor::default());

    let pipeline = Pipeline::new(
        QueryAdmissionFilter::new(embedder.clone()),
        Arc::new(SearxClient::new(
            &CONFIG.searx_url,
            CONFIG.search_result_count,
        )),
        generator,
        RelevanceScorer::new(embedder, keywords.clone()),
        SummaryValidator::new(keywords),
        Arc::new(FileSink::new(&CONFIG.output_dir)),
    )
    .with_max_retries(CONFIG.max_retries)
    .with_output_filename(&args.output);

    match pipeline.run(&args.query).await {
        Ok(report) => {
            println!("{}", report.summary);
            if report.validation.is_valid {
                println!("\n[validated: score {:.3}]", report.validation.score);
            } else {
                println!(
                    "\n[not validated: {} (score {:.3})]",
                    report.validation.reason, report.validation.score
                );
            }
            if let Some(path) = &report.document_path {
                println!("[saved to {}]", path.display());
            }
            if let Some(err) = &report.save_error {
                println!("[save failed: {err}]");
            }
        }
        Err(e) => println!("{e:#}"),
    }
    Ok(())
}

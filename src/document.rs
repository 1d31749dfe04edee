use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data_models::Citation;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported file extension: {0} (only .md is supported)")]
    UnsupportedExtension(String),
    #[error("permission denied: cannot write to {0}")]
    PermissionDenied(String),
    #[error("io error while saving document: {0}")]
    Io(#[from] std::io::Error),
}

/// A finished document ready for persistence: topic, summary body, citation
/// list, and whether the summary passed validation.
#[derive(Debug, Clone)]
pub struct Document {
    pub topic: String,
    pub summary: String,
    pub works_cited: Vec<Citation>,
    pub validated: bool,
}

impl Document {
    pub fn new(topic: String, summary: String, works_cited: Vec<Citation>) -> Document {
        Document {
            topic,
            summary,
            works_cited,
            validated: true,
        }
    }

    pub fn with_validated(mut self, validated: bool) -> Document {
        self.validated = validated;
        self
    }

    pub fn title(&self) -> String {
        format!("Summary of {}", self.topic)
    }

    /// Renders the markdown body: title header, summary, optional
    /// validation warning, optional works-cited block.
    pub fn render(&self) -> String {
        let mut content = format!("# {}\n\n{}\n\n", self.title(), self.summary);

        if !self.validated {
            content.push_str(
                "> Warning: this summary did not pass automated relevance validation.\n\n",
            );
        }

        if !self.works_cited.is_empty() {
            content.push_str("## Works Cited\n");
            for citation in &self.works_cited {
                content.push_str(&format!("- {}: {}\n", citation.title, citation.link));
            }
        }

        content
    }
}

/// The persistence collaborator: accepts a filename and a finished document
/// and writes it to durable storage.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn save(&self, filename: &str, document: &Document) -> Result<PathBuf, DocumentError>;
}

/// Writes documents to a directory on the local filesystem. Markdown is the
/// only validated target format; the extension check runs before any I/O.
pub struct FileSink {
    output_dir: PathBuf,
}

impl FileSink {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl DocumentSink for FileSink {
    async fn save(&self, filename: &str, document: &Document) -> Result<PathBuf, DocumentError> {
        if !filename.ends_with(".md") {
            let extension = Path::new(filename)
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| "<none>".to_string());
            return Err(DocumentError::UnsupportedExtension(extension));
        }

        let path = self.output_dir.join(filename);
        match tokio::fs::write(&path, document.render()).await {
            Ok(()) => {
                log::info!("document saved to {}", path.display());
                Ok(path)
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(DocumentError::PermissionDenied(path.display().to_string()))
            }
            Err(e) => Err(DocumentError::Io(e)),
        }
    }
}

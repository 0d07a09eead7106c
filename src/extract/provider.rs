//! Core trait and default implementation for text extraction.

use async_trait::async_trait;
use std::path::Path;

use super::kind::DocumentKind;
use super::{docx, pdf};

/// Errors that can occur during text extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The file extension is not a supported document format.
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    /// The document could not be parsed.
    #[error("Malformed {kind} document: {reason}")]
    Malformed { kind: DocumentKind, reason: String },

    /// The extraction task did not complete.
    #[error("Extraction failed: {0}")]
    Failed(String),

    /// An I/O error occurred while reading the file.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Trait for document text extractors.
///
/// Implementors read a stored upload and return its plain-text contents.
#[async_trait]
pub trait TextExtractor: Send + Sync + std::fmt::Debug {
    /// Extract the plain text of the file at `path`.
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Extractor for PDF and DOCX files, dispatching on the file extension.
#[derive(Debug, Default)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    /// Create a new document extractor.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| ExtractionError::UnsupportedType(path.display().to_string()))?;

        let data = tokio::fs::read(path).await?;

        // Parsing is CPU-bound and may panic on hostile input.
        let text = tokio::task::spawn_blocking(move || match kind {
            DocumentKind::Pdf => pdf::extract_text(&data),
            DocumentKind::Docx => docx::extract_text(&data),
        })
        .await
        .map_err(|e| ExtractionError::Failed(format!("Task join error: {e}")))??;

        tracing::debug!(
            path = %path.display(),
            kind = %kind,
            chars = text.len(),
            "Extracted document text"
        );

        Ok(text)
    }
}

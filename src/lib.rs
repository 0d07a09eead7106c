//! Document chat backend.
//!
//! Accepts an uploaded PDF or DOCX, extracts its text into an in-memory
//! session, and answers questions about it through a remote LLM.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server
//! - **Session memory**: Thread-safe store of document text and transcripts
//! - **Extraction**: PDF and DOCX text extraction
//! - **Completion client**: Gemini `generateContent` API
//!
//! # Modules
//!
//! - [`api`]: HTTP handlers
//! - [`config`]: Layered configuration
//! - [`extract`]: Document text extraction
//! - [`llm`]: Completion client trait and Gemini implementation
//! - [`session`]: Session memory and context assembly
//! - [`uploads`]: On-disk upload storage

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod server;
pub mod session;
pub mod uploads;

use std::sync::Arc;

use extract::{DocumentExtractor, TextExtractor};
use llm::CompletionClient;
use session::SessionStore;
use uploads::UploadStore;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session store for document text and transcripts.
    pub sessions: SessionStore,
    /// Text extractor for uploaded documents.
    pub extractor: Arc<dyn TextExtractor>,
    /// Client for the remote completion API.
    pub completions: Arc<dyn CompletionClient>,
    /// Where uploaded files are written.
    pub uploads: UploadStore,
}

impl AppState {
    /// State with a fresh session store and the default document extractor.
    pub fn new(completions: Arc<dyn CompletionClient>, uploads: UploadStore) -> Self {
        Self {
            sessions: SessionStore::new(),
            extractor: Arc::new(DocumentExtractor::new()),
            completions,
            uploads,
        }
    }
}

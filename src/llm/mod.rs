//! Remote completion client.
//!
//! This module provides the seam between the HTTP handlers and the external
//! text-generation API. Handlers depend only on the [`CompletionClient`]
//! trait, so tests can substitute a stub.
//!
//! # Clients
//!
//! - [`GeminiClient`]: Google Gemini `generateContent` API
//!
//! # Example
//!
//! ```rust,ignore
//! use docchat::llm::{CompletionClient, GeminiClient, LlmSettings};
//!
//! let client = GeminiClient::new(settings)?;
//! let answer = client.complete(&build_prompt(&context, "What is the refund policy?")).await?;
//! ```

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;
pub use prompt::build_prompt;

use std::fmt;
use std::time::Duration;

/// Connection and model settings for the completion API.
#[derive(Clone)]
pub struct LlmSettings {
    /// Base URL of the API, without the `/models/...` suffix.
    pub base_url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// Model identifier (e.g. `gemini-2.0-flash`).
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Errors returned by completion clients.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The API answered with a non-success status.
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The API answered successfully but the body did not match the schema.
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    /// The request never produced a response (connect failure, timeout, ...).
    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A client able to answer a fully assembled prompt.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync + fmt::Debug {
    /// Send `prompt` and return the model's answer text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

//! Google Gemini `generateContent` client.
//!
//! Sends the prompt as a single user content part and reads the answer from
//! the first part of the first candidate. The response is decoded into a
//! typed schema; any deviation is reported as
//! [`LlmError::MalformedResponse`].

use serde::{Deserialize, Serialize};

use super::{CompletionClient, LlmError, LlmSettings};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("settings", &self.settings)
            .finish()
    }
}

impl GeminiClient {
    /// Create a client with the given settings.
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    /// Full URL of the `generateContent` method for the configured model.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait::async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateContentRequest::from_prompt(prompt);

        tracing::debug!(
            model = %self.settings.model,
            prompt_len = prompt.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                name: "llm.upstream.error",
                status = status.as_u16(),
                "Gemini API returned an error"
            );
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        parse_answer(&body)
    }
}

/// Decode a `generateContent` response body and extract the answer text.
pub fn parse_answer(body: &str) -> Result<String, LlmError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
    response.into_answer()
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: None,
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_answer(self) -> Result<String, LlmError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("response has no candidates".into()))?;

        let finish_reason = candidate.finish_reason.unwrap_or_default();
        let content = candidate.content.ok_or_else(|| {
            LlmError::MalformedResponse(format!(
                "candidate has no content (finish reason: {finish_reason})"
            ))
        })?;

        content
            .parts
            .into_iter()
            .next()
            .and_then(|part| part.text)
            .ok_or_else(|| LlmError::MalformedResponse("candidate has no text part".into()))
    }
}

//! Document chat handler.

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::llm::build_prompt;

/// Request body for the chat API.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Session returned by the upload API.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Question about the uploaded document.
    #[serde(default)]
    pub question: Option<String>,
}

/// Response from the chat API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

fn missing_fields() -> ApiError {
    ApiError::BadRequest("session_id and question required".to_string())
}

/// Answer a question grounded in the session's document.
///
/// POST /chat
///
/// The exchange is recorded only after the model answered; a failed upstream
/// call leaves the session history untouched.
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected chat body");
        missing_fields()
    })?;

    let session_id = req
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(missing_fields)?;
    let question = req
        .question
        .filter(|q| !q.is_empty())
        .ok_or_else(missing_fields)?;

    let context = state.sessions.get_full_context(&session_id)?;
    let prompt = build_prompt(&context, &question);

    let answer = state.completions.complete(&prompt).await?;

    state
        .sessions
        .record_exchange(&session_id, question, answer.as_str())?;

    tracing::info!(
        name: "chat.answered",
        session_id = %session_id,
        answer_len = answer.len(),
        "Chat answered"
    );

    Ok(Json(ChatResponse { answer }))
}

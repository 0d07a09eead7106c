//! HTTP API handlers.
//!
//! - `POST /upload`: accept a PDF/DOCX and open a session
//! - `POST /chat`: answer a question about a session's document
//! - `GET /sessions/{id}/history`: recorded turns of a session
//! - `GET /health`: liveness probe

pub mod chat;
pub mod sessions;
pub mod upload;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

/// Build the API router. State and middleware are applied by the caller.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload::upload_handler))
        .route("/chat", post(chat::chat_handler))
        .route("/sessions/{id}/history", get(sessions::history_handler))
        .route("/health", get(sessions::health_handler))
}

//! HTTP error responses.
//!
//! Every failure leaves the service as `{"error": "<message>"}` with a status
//! chosen by error kind:
//!
//! | Kind | Status |
//! |---|---|
//! | invalid client input | 400 |
//! | unreadable multipart body | status reported by axum (400, 413) |
//! | unknown session | 404 |
//! | request timeout | 408 |
//! | upstream non-success | 500, upstream body verbatim |
//! | malformed upstream response | 502 |
//! | extraction, storage, transport | 500 |

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::extract::ExtractionError;
use crate::llm::LlmError;
use crate::session::SessionError;

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid client input.
    #[error("{0}")]
    BadRequest(String),

    /// The multipart body could not be read, e.g. it exceeds the body limit.
    #[error("Failed to read upload: {}", .0.body_text())]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Failed to store upload: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Request timed out")]
    Timeout,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Multipart(e) => e.status(),
            Self::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Llm(LlmError::MalformedResponse(_)) => StatusCode::BAD_GATEWAY,
            Self::Extraction(_)
            | Self::Storage(_)
            | Self::Llm(LlmError::Upstream { .. } | LlmError::Transport(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(self) -> String {
        match self {
            // Upstream failures are passed through untouched.
            Self::Llm(LlmError::Upstream { body, .. }) => body,
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(name: "api.error", status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

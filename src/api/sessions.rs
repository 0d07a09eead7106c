//! Session inspection handlers.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::session::ChatTurn;

/// GET /sessions/{id}/history - Recorded turns, oldest first.
pub async fn history_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatTurn>>, ApiError> {
    Ok(Json(state.sessions.history(&id)?))
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
}

/// GET /health - Liveness probe.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.sessions.len(),
    })
}

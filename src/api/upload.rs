//! Document upload handler.
//!
//! Accepts a multipart form with a single `file` field, extracts its text and
//! opens a new session holding that text.

use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::DocumentKind;
use crate::uploads::sanitize_filename;

/// Multipart field carrying the document.
const FILE_FIELD: &str = "file";

/// Response for a successfully uploaded document.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub session_id: String,
}

/// Upload a document and start a session.
///
/// POST /upload
///
/// Validation happens before anything is written, and the session is only
/// registered once text extraction succeeded. A failed or abandoned upload
/// leaves neither a session nor a stored file behind.
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        upload = Some((filename, data));
        break;
    }

    let (original_name, data) =
        upload.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;

    if original_name.is_empty() {
        return Err(ApiError::BadRequest("No file selected".to_string()));
    }

    let filename = sanitize_filename(&original_name);
    if filename.is_empty() {
        return Err(ApiError::BadRequest("Invalid filename".to_string()));
    }

    let kind = DocumentKind::from_filename(&filename)
        .ok_or_else(|| ApiError::BadRequest("Only PDF or DOCX allowed".to_string()))?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let staged = state.uploads.stage(&session_id, &filename, &data).await?;
    let text = state.extractor.extract(staged.path()).await?;

    state.sessions.create_session(&session_id);
    state.sessions.store_document(&session_id, text)?;
    staged.commit();

    tracing::info!(
        name: "upload.accepted",
        session_id = %session_id,
        filename = %filename,
        kind = %kind,
        size = data.len(),
        "Document uploaded"
    );

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        session_id,
    }))
}

//! PDF text layer extraction.

use super::kind::DocumentKind;
use super::provider::ExtractionError;

/// Extract the text layer of a PDF held in memory.
///
/// Image-only PDFs yield an empty string; OCR is out of scope.
pub(super) fn extract_text(data: &[u8]) -> Result<String, ExtractionError> {
    let text =
        pdf_extract::extract_text_from_mem(data).map_err(|e| ExtractionError::Malformed {
            kind: DocumentKind::Pdf,
            reason: e.to_string(),
        })?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        tracing::warn!("PDF contains no extractable text - may be image-based");
    }
    Ok(trimmed.to_string())
}

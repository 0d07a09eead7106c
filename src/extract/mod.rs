//! Document text extraction.
//!
//! Turns an uploaded PDF or DOCX file into plain text for the session store.
//!
//! # Formats
//!
//! - PDF: text layer via `pdf-extract`
//! - DOCX: `word/document.xml` runs, read from the zip container
//!
//! # Usage
//!
//! ```rust,ignore
//! use docchat::extract::{DocumentExtractor, TextExtractor};
//!
//! let text = DocumentExtractor::new().extract(Path::new("policy.pdf")).await?;
//! ```

mod docx;
mod kind;
mod pdf;
mod provider;

pub use kind::DocumentKind;
pub use provider::{DocumentExtractor, ExtractionError, TextExtractor};

//! Supported document formats.

use std::fmt;
use std::path::Path;

/// Document formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Detect the format from a file name's extension, ignoring case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use docchat::extract::DocumentKind;
    ///
    /// assert_eq!(DocumentKind::from_filename("Report.PDF"), Some(DocumentKind::Pdf));
    /// assert_eq!(DocumentKind::from_filename("notes.txt"), None);
    /// ```
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename).extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else if extension.eq_ignore_ascii_case("docx") {
            Some(Self::Docx)
        } else {
            None
        }
    }

    /// Detect the format of a file on disk.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::from_filename)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::Docx => f.write_str("docx"),
        }
    }
}

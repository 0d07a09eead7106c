//! On-disk storage for uploaded documents.
//!
//! Files land under `<root>/<session_id>/<sanitized name>` so two sessions
//! uploading the same file name never overwrite each other.

use std::path::{Path, PathBuf};

/// Writes uploaded files beneath a root directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory for all uploads.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `data` for a session and return the written path.
    ///
    /// `filename` must already be sanitized.
    pub async fn save(
        &self,
        session_id: &str,
        filename: &str,
        data: &[u8],
    ) -> std::io::Result<PathBuf> {
        let dir = self.root.join(session_id);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(filename);
        tokio::fs::write(&path, data).await?;

        tracing::debug!(path = %path.display(), size = data.len(), "Stored upload");
        Ok(path)
    }

    /// Persist `data` like [`save`](Self::save), but remove it again unless
    /// the returned [`StagedUpload`] is committed.
    ///
    /// Covers every early exit, including the handler future being dropped
    /// by the request timeout.
    pub async fn stage(
        &self,
        session_id: &str,
        filename: &str,
        data: &[u8],
    ) -> std::io::Result<StagedUpload> {
        let path = self.save(session_id, filename, data).await?;
        Ok(StagedUpload {
            store: Some(self.clone()),
            session_id: session_id.to_string(),
            path,
        })
    }

    /// Remove everything stored for a session. Failures are logged only.
    pub async fn discard(&self, session_id: &str) {
        let dir = self.root.join(session_id);
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to discard upload");
        }
    }

    fn discard_blocking(&self, session_id: &str) {
        let dir = self.root.join(session_id);
        if let Err(e) = std::fs::remove_dir_all(&dir) {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to discard upload");
        }
    }
}

/// An upload written to disk but not yet owned by a session.
///
/// Dropping it without [`commit`](Self::commit) discards the session's
/// upload directory in the background.
#[derive(Debug)]
pub struct StagedUpload {
    store: Option<UploadStore>,
    session_id: String,
    path: PathBuf,
}

impl StagedUpload {
    /// Path of the stored file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file.
    pub fn commit(mut self) -> PathBuf {
        self.store = None;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        let Some(store) = self.store.take() else {
            return;
        };
        let session_id = std::mem::take(&mut self.session_id);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { store.discard(&session_id).await });
            }
            Err(_) => store.discard_blocking(&session_id),
        }
    }
}

/// Reduce a client-supplied file name to a safe, flat name.
///
/// Path separators become spaces, whitespace runs collapse to `_`, accented
/// Latin letters fold to ASCII and anything outside `[A-Za-z0-9_.-]` is
/// dropped. Leading and trailing `.`/`_` are stripped, so the result can
/// never name a parent directory. Returns an empty string when nothing safe
/// remains.
pub fn sanitize_filename(filename: &str) -> String {
    let spaced: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter_map(fold_to_ascii)
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '_' | '.' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

fn fold_to_ascii(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(folded)
}

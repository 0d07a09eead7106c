//! Session records and the shared session store.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a recorded chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    /// The person asking questions about the document.
    User,
    /// The model's reply.
    Assistant,
}

impl Speaker {
    /// Label used when rendering the transcript.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded message. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub message: String,
}

impl ChatTurn {
    fn new(speaker: Speaker, message: impl Into<String>) -> Self {
        Self {
            speaker,
            message: message.into(),
        }
    }
}

impl fmt::Display for ChatTurn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker, self.message)
    }
}

/// State of one document conversation.
///
/// Returned by [`SessionStore::snapshot`] as an owned copy; the store keeps
/// the authoritative record.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// Text extracted from the uploaded document, if stored yet.
    pub document_text: Option<String>,
    /// Recorded turns in insertion order.
    pub chat_history: Vec<ChatTurn>,
    /// Session creation time.
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            document_text: None,
            chat_history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Render the document text followed by the transcript.
    #[must_use]
    pub fn render_context(&self) -> String {
        let document = self.document_text.as_deref().unwrap_or_default();
        let history = self
            .chat_history
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");

        format!("Document:\n{document}\n\nChat History:\n{history}")
    }
}

/// Errors raised by session lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No session was ever created under this identifier.
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Thread-safe store for sessions.
///
/// Cloning the store is cheap and every clone shares the same sessions. Each
/// operation takes the lock once and releases it before returning, so no lock
/// is ever held across an await point by callers.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create an empty session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    // A poisoned lock still guards a structurally valid map: every mutation
    // below is a single insert or push.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a session with no document and an empty history.
    ///
    /// An existing session under the same id is replaced.
    pub fn create_session(&self, id: impl Into<String>) {
        let id = id.into();
        let mut guard = self.write();
        if guard.insert(id.clone(), Session::new(id.clone())).is_some() {
            tracing::warn!(session_id = %id, "Existing session reset");
        }
    }

    /// Set the document text for a session, replacing any previous text.
    pub fn store_document(&self, id: &str, text: impl Into<String>) -> Result<(), SessionError> {
        let mut guard = self.write();
        let session = guard
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.document_text = Some(text.into());
        Ok(())
    }

    /// Append one turn to a session's history.
    pub fn add_chat(
        &self,
        id: &str,
        speaker: Speaker,
        message: impl Into<String>,
    ) -> Result<(), SessionError> {
        let mut guard = self.write();
        let session = guard
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.chat_history.push(ChatTurn::new(speaker, message));
        Ok(())
    }

    /// Append a question and its answer as one atomic step.
    ///
    /// Concurrent chats on the same session never interleave between the
    /// user turn and the assistant turn recorded here.
    pub fn record_exchange(
        &self,
        id: &str,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<(), SessionError> {
        let mut guard = self.write();
        let session = guard
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.chat_history.extend([
            ChatTurn::new(Speaker::User, question),
            ChatTurn::new(Speaker::Assistant, answer),
        ]);
        Ok(())
    }

    /// Assemble the document text and transcript into one prompt context.
    pub fn get_full_context(&self, id: &str) -> Result<String, SessionError> {
        self.read()
            .get(id)
            .map(Session::render_context)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Recorded turns for a session, oldest first.
    pub fn history(&self, id: &str) -> Result<Vec<ChatTurn>, SessionError> {
        self.read()
            .get(id)
            .map(|session| session.chat_history.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Owned copy of a session's current state.
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<Session> {
        self.read().get(id).cloned()
    }

    /// Check whether a session exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Get the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Session memory and context assembly.
//!
//! This module provides in-memory session storage for document chats. A
//! session is created when a document is uploaded, holds the text extracted
//! from that document, and accumulates the transcript of questions and
//! answers. Sessions are identified by UUID.
//!
//! # Architecture
//!
//! - [`Session`]: Snapshot of a single conversation's state
//! - [`ChatTurn`]: One recorded message and its [`Speaker`]
//! - [`SessionStore`]: Thread-safe store for all sessions
//!
//! # Example
//!
//! ```rust
//! use docchat::session::{SessionStore, Speaker};
//!
//! let store = SessionStore::new();
//! store.create_session("s1");
//! store.store_document("s1", "Policy: refunds within 30 days.").unwrap();
//! store.add_chat("s1", Speaker::User, "What is the refund policy?").unwrap();
//!
//! let context = store.get_full_context("s1").unwrap();
//! assert!(context.contains("User: What is the refund policy?"));
//! ```

mod store;

pub use store::{ChatTurn, Session, SessionError, SessionStore, Speaker};

//! Session domain model.

use super::title::derive_title;
use crate::message::Message;
use crate::window::Window;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted window conversation.
///
/// The session is keyed by the id of the window conversation it was taken
/// from and tagged with the model that window was bound to. `created_at` is
/// fixed on first recording; `updated_at` and `messages` are replaced on
/// every upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Key of the model the conversation was held with
    pub model_key: String,
    /// Human-readable title derived from the transcript
    pub title: String,
    /// Full transcript
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Snapshots a window into a session.
    ///
    /// Returns `None` for windows that are unbound or have an empty
    /// transcript; those are never recorded.
    pub fn from_window(window: &Window, now: DateTime<Utc>) -> Option<Self> {
        let model_key = window.model_key.as_ref()?;
        if window.messages.is_empty() {
            return None;
        }

        Some(Self {
            id: window.session_id.clone(),
            model_key: model_key.clone(),
            title: derive_title(&window.messages),
            messages: window.messages.clone(),
            created_at: now,
            updated_at: now,
        })
    }
}

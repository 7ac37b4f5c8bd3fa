//! Generation windows.

use crate::message::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable window identifier, never reissued within a process.
pub type WindowId = u64;

/// Smallest number of visible windows.
pub const MIN_LAYOUT_COUNT: usize = 1;
/// Largest number of visible windows.
pub const MAX_LAYOUT_COUNT: usize = 4;

/// One independent generation lane.
///
/// A window is bound to at most one model, holds its own transcript and
/// belongs to exactly one session at a time. The session id is replaced
/// whenever the window starts a new conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub id: WindowId,
    /// Key of the bound model, if any
    pub model_key: Option<String>,
    /// Ordered transcript
    pub messages: Vec<Message>,
    /// True while the latest dispatch for this window has not settled
    pub generating: bool,
    /// Session this window's transcript is recorded under
    pub session_id: String,
    /// Id of the most recent dispatch issued for this window
    #[serde(default)]
    pub pending_dispatch: Option<u64>,
}

impl Window {
    /// Creates an empty window with a fresh session id.
    pub fn new(id: WindowId, model_key: Option<String>) -> Self {
        Self {
            id,
            model_key,
            messages: Vec::new(),
            generating: false,
            session_id: new_session_id(),
            pending_dispatch: None,
        }
    }

    /// Starts a new conversation bound to `model_key`.
    pub fn reset(&mut self, model_key: Option<String>) {
        self.model_key = model_key;
        self.messages.clear();
        self.generating = false;
        self.pending_dispatch = None;
        self.session_id = new_session_id();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn find_message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }
}

/// Generates a fresh session identifier.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_replaces_session_id() {
        let mut window = Window::new(1, Some("A::m".into()));
        window.messages.push(Message::user("cat", vec![]));
        window.generating = true;
        window.pending_dispatch = Some(3);
        let before = window.session_id.clone();

        window.reset(Some("B::m".into()));

        assert!(window.is_empty());
        assert!(!window.generating);
        assert_eq!(window.pending_dispatch, None);
        assert_eq!(window.model_key.as_deref(), Some("B::m"));
        assert_ne!(window.session_id, before);
    }
}

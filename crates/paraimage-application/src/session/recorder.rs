use super::cache::HistoryCache;
use chrono::{DateTime, Utc};
use paraimage_core::{Session, Window};

/// Turns window snapshots into session upserts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionRecorder;

impl SessionRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Records a window into `history`.
    ///
    /// Unbound windows and empty transcripts are ignored. An existing entry
    /// with the same id keeps its `created_at`. Returns the stored session so
    /// the caller can hand it to persistence.
    pub fn record(
        &self,
        history: &mut HistoryCache,
        window: &Window,
        now: DateTime<Utc>,
    ) -> Option<Session> {
        let mut session = Session::from_window(window, now)?;

        if let Some(existing) = history.find_in_model(&session.model_key, &session.id) {
            session.created_at = existing.created_at;
        }

        tracing::debug!(
            "[SessionRecorder] Recording session {} for model {} ({} messages)",
            session.id,
            session.model_key,
            session.messages.len()
        );

        history.upsert(session.clone());
        Some(session)
    }
}

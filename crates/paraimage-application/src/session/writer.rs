use paraimage_core::{Session, SessionRepository};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Persists recorded sessions on a single background task.
///
/// Sessions are written in the order they were enqueued, so two snapshots of
/// the same session always reach the store in recording order. Failures are
/// logged and swallowed. `on_written` is invoked after every attempt.
#[derive(Clone)]
pub struct SessionWriter {
    tx: mpsc::UnboundedSender<Session>,
}

impl SessionWriter {
    /// Spawns the writer task. Must be called within a tokio runtime.
    pub fn spawn<F>(repository: Arc<dyn SessionRepository>, on_written: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Session>();

        tokio::spawn(async move {
            while let Some(session) = rx.recv().await {
                if let Err(e) = repository.upsert(&session).await {
                    tracing::warn!(
                        "[SessionWriter] Failed to persist session {}: {}",
                        session.id,
                        e
                    );
                }
                on_written();
            }
            tracing::debug!("[SessionWriter] Queue closed, writer stopped");
        });

        Self { tx }
    }

    /// Queues a session for persistence. Returns `false` if the writer is gone.
    pub fn enqueue(&self, session: Session) -> bool {
        self.tx.send(session).is_ok()
    }
}

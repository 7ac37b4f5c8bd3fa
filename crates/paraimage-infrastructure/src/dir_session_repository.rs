//! Directory-based SessionRepository implementation.

use crate::dto::SessionDocument;
use crate::paths::ParaImagePaths;
use crate::storage::AtomicFile;
use async_trait::async_trait;
use paraimage_core::error::{ParaImageError, Result};
use paraimage_core::{Session, SessionRepository};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores each session as its own JSON file.
///
/// Directory structure:
/// ```text
/// sessions/
/// ├── 6f1c...-id-1.json
/// └── 0a9e...-id-2.json
/// ```
///
/// Listing scans the directory; files that cannot be read or parsed are
/// skipped with a warning so one corrupt file never hides the rest.
pub struct DirSessionRepository {
    sessions_dir: PathBuf,
}

impl DirSessionRepository {
    /// Creates a repository at the default location (`<data>/sessions`).
    pub async fn default_location() -> Result<Self> {
        let sessions_dir = ParaImagePaths::sessions_dir()?;
        Self::new(sessions_dir).await
    }

    /// Creates a repository rooted at `sessions_dir`, creating it if needed.
    pub async fn new(sessions_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        fs::create_dir_all(&sessions_dir).await?;
        Ok(Self { sessions_dir })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn file_for(&self, session_id: &str) -> Result<AtomicFile<SessionDocument>> {
        if !is_safe_file_stem(session_id) {
            return Err(ParaImageError::data_access(format!(
                "invalid session id '{}'",
                session_id
            )));
        }
        Ok(AtomicFile::json(
            self.sessions_dir.join(format!("{}.json", session_id)),
        ))
    }

    async fn load_all(&self) -> Result<Vec<Session>> {
        let mut entries = fs::read_dir(&self.sessions_dir).await?;
        let mut sessions = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match load_document(path.clone()).await {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "[DirSessionRepository] Skipping unreadable session file {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok(sessions)
    }
}

async fn load_document(path: PathBuf) -> Result<Option<Session>> {
    let loaded = tokio::task::spawn_blocking(move || AtomicFile::<SessionDocument>::json(path).load())
        .await
        .map_err(|e| ParaImageError::internal(format!("session load task failed: {}", e)))??;

    loaded.map(SessionDocument::into_domain).transpose()
}

/// Session ids become file names; only accept plain identifiers.
fn is_safe_file_stem(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl SessionRepository for DirSessionRepository {
    async fn list_by_model(&self, model_key: &str) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|s| s.model_key == model_key)
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        tracing::debug!(
            "[DirSessionRepository] Listed {} session(s) for model {}",
            sessions.len(),
            model_key
        );
        Ok(sessions)
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        let file = self.file_for(session_id)?;
        load_document(file.path().to_path_buf()).await
    }

    async fn upsert(&self, session: &Session) -> Result<()> {
        let file = self.file_for(&session.id)?;
        let document = SessionDocument::from(session);

        tokio::task::spawn_blocking(move || file.save(&document))
            .await
            .map_err(|e| ParaImageError::internal(format!("session save task failed: {}", e)))??;

        tracing::debug!("[DirSessionRepository] Saved session {}", session.id);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let file = self.file_for(session_id)?;
        tokio::task::spawn_blocking(move || file.remove())
            .await
            .map_err(|e| ParaImageError::internal(format!("session delete task failed: {}", e)))??;
        Ok(())
    }
}

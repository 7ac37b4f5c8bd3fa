//! Session repository trait.
//!
//! Defines the interface for session persistence operations.

use super::model::Session;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for managing session persistence.
///
/// This trait defines the contract for persisting and retrieving sessions,
/// decoupling the orchestrator from the specific storage mechanism
/// (e.g., JSON files, database, remote API).
///
/// # Implementation Notes
///
/// The orchestrator only ever calls `upsert` and `list_by_model`, and treats
/// every failure as non-fatal. Implementations should still report errors
/// faithfully so callers can log them.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Lists the sessions recorded for one model.
    ///
    /// # Arguments
    ///
    /// * `model_key` - Key of the model whose history is requested
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Session>)`: Sessions for the model, newest first
    /// - `Err(_)`: Error occurred during listing
    async fn list_by_model(&self, model_key: &str) -> Result<Vec<Session>>;

    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>>;

    /// Inserts or replaces a session.
    ///
    /// # Arguments
    ///
    /// * `session` - The session to save; an existing entry with the same id is overwritten
    async fn upsert(&self, session: &Session) -> Result<()>;

    /// Deletes a session from storage.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Session deleted successfully (or didn't exist)
    /// - `Err(_)`: Error occurred during deletion
    async fn delete(&self, session_id: &str) -> Result<()>;
}

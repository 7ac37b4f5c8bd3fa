//! Session DTO.

use chrono::{DateTime, Utc};
use paraimage_core::error::{ParaImageError, Result};
use paraimage_core::{Message, Session};
use serde::{Deserialize, Serialize};

/// Current schema version of session files.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SESSION_SCHEMA_VERSION
}

/// One session as stored in `sessions/<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub id: String,
    pub model_key: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionDocument {
    fn from(session: &Session) -> Self {
        Self {
            schema_version: SESSION_SCHEMA_VERSION,
            id: session.id.clone(),
            model_key: session.model_key.clone(),
            title: session.title.clone(),
            messages: session.messages.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

impl SessionDocument {
    /// Converts the document into the domain model.
    pub fn into_domain(self) -> Result<Session> {
        if self.schema_version > SESSION_SCHEMA_VERSION {
            return Err(ParaImageError::Serialization {
                format: "JSON".to_string(),
                message: format!(
                    "session {} uses schema version {} (supported: {})",
                    self.id, self.schema_version, SESSION_SCHEMA_VERSION
                ),
            });
        }

        Ok(Session {
            id: self.id,
            model_key: self.model_key,
            title: self.title,
            messages: self.messages,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

//! Transcript messages.

use crate::generation::{GeneratedImage, GenerationError};
use crate::reference::ReferenceImage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One transcript entry. Messages are append-only and never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier (UUID format)
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: MessageBody,
}

/// What a message says and who said it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum MessageBody {
    User {
        prompt: String,
        #[serde(default)]
        references: Vec<ReferenceImage>,
    },
    Assistant {
        /// Key of the model that answered
        model_key: String,
        outcome: AssistantOutcome,
    },
}

/// Exactly one of a produced image or an error description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantOutcome {
    Image(GeneratedImage),
    Error(String),
}

impl Message {
    /// Creates a user message stamped with a fresh id and the current time.
    pub fn user(prompt: impl Into<String>, references: Vec<ReferenceImage>) -> Self {
        Self::with_body(MessageBody::User {
            prompt: prompt.into(),
            references,
        })
    }

    /// Creates an assistant message from a settled generation call.
    pub fn assistant(
        model_key: impl Into<String>,
        result: std::result::Result<GeneratedImage, GenerationError>,
    ) -> Self {
        let outcome = match result {
            Ok(image) => AssistantOutcome::Image(image),
            Err(err) => AssistantOutcome::Error(err.display_text()),
        };
        Self::with_body(MessageBody::Assistant {
            model_key: model_key.into(),
            outcome,
        })
    }

    fn with_body(body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            body,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self.body, MessageBody::User { .. })
    }

    /// Prompt text of a user message.
    pub fn prompt(&self) -> Option<&str> {
        match &self.body {
            MessageBody::User { prompt, .. } => Some(prompt),
            MessageBody::Assistant { .. } => None,
        }
    }

    /// Reference images of a user message (empty for assistant messages).
    pub fn references(&self) -> &[ReferenceImage] {
        match &self.body {
            MessageBody::User { references, .. } => references,
            MessageBody::Assistant { .. } => &[],
        }
    }

    /// Whether this is a user message that can be sent to a backend again.
    pub fn is_retryable(&self) -> bool {
        match &self.body {
            MessageBody::User { prompt, references } => {
                !prompt.trim().is_empty() || !references.is_empty()
            }
            MessageBody::Assistant { .. } => false,
        }
    }

    pub fn image(&self) -> Option<&GeneratedImage> {
        match &self.body {
            MessageBody::Assistant {
                outcome: AssistantOutcome::Image(image),
                ..
            } => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Assistant {
                outcome: AssistantOutcome::Error(text),
                ..
            } => Some(text),
            _ => None,
        }
    }
}

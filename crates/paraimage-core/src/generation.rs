//! The uniform generation call every backend is reached through.

use crate::reference::ReferenceImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallback text for a failure that carries no usable description.
pub const GENERIC_GENERATION_ERROR: &str = "Image generation failed";

/// Everything a backend needs to produce one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Backend-specific model identifier
    pub model_id: String,
    /// Provider that offers the model
    pub provider_name: String,
    pub prompt: String,
    pub references: Vec<ReferenceImage>,
    /// Requested size ("1024x1024", "2K", ...); backends pick a default when absent
    pub size: Option<String>,
}

/// A produced image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Data URL or remote URL of the image
    pub url: String,
}

impl GeneratedImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Why a generation call failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Provider settings are missing or incomplete
    #[error("{0}")]
    Configuration(String),

    /// The request never produced an HTTP response
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider answered with an error status
    #[error("{message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    /// The provider answered, but not with an image
    #[error("{0}")]
    InvalidResponse(String),

    /// The call was rejected before it could settle (e.g. the task panicked)
    #[error("generation task aborted")]
    Aborted,
}

impl GenerationError {
    /// Text shown in the window's transcript for this failure.
    ///
    /// Falls back to [`GENERIC_GENERATION_ERROR`] when the failure has no
    /// description of its own.
    pub fn display_text(&self) -> String {
        let text = match self {
            GenerationError::Aborted => return GENERIC_GENERATION_ERROR.to_string(),
            other => other.to_string(),
        };
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "request failed:" {
            GENERIC_GENERATION_ERROR.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// The single uniform generation call.
///
/// Implementations must report every failure (transport, provider, malformed
/// response) through the `Err` variant; the coordinator treats a panic the same
/// way.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GeneratedImage, GenerationError>;
}

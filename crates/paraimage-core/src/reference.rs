//! Reference images attached to a prompt.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A user-supplied input image, materialized into self-contained content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    /// Original filename
    pub name: String,
    /// Inline content as a `data:<mime>;base64,<payload>` URL
    pub data_url: String,
}

impl ReferenceImage {
    pub fn new(name: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_url: data_url.into(),
        }
    }

    /// MIME type declared in the data URL, if any.
    pub fn mime_type(&self) -> Option<&str> {
        let header = self.data_url.strip_prefix("data:")?.split(',').next()?;
        let mime = header.split(';').next()?;
        (!mime.is_empty()).then_some(mime)
    }

    /// Base64 payload of the data URL, if any.
    pub fn base64_payload(&self) -> Option<&str> {
        if !self.data_url.starts_with("data:") {
            return None;
        }
        let (_, payload) = self.data_url.split_once(',')?;
        (!payload.is_empty()).then_some(payload)
    }
}

/// A not-yet-materialized reference image, as handed over by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceFile {
    /// A file on the local filesystem
    Path(PathBuf),
    /// Raw bytes already in memory
    Bytes {
        name: String,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl ReferenceFile {
    /// Display name used for the materialized image.
    pub fn display_name(&self) -> String {
        match self {
            ReferenceFile::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            ReferenceFile::Bytes { name, .. } => name.clone(),
        }
    }
}

/// Turns a reference file into self-contained content.
///
/// Used once per reference image before a submission is dispatched; any
/// failure aborts the whole submission.
#[async_trait]
pub trait FileMaterializer: Send + Sync {
    async fn materialize(&self, file: &ReferenceFile) -> Result<ReferenceImage>;
}

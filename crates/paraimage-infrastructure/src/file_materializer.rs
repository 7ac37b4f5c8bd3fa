//! Filesystem reference image materializer.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use paraimage_core::error::{ParaImageError, Result};
use paraimage_core::{FileMaterializer, ReferenceFile, ReferenceImage};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Reads reference images from disk (or memory) into base64 data URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsFileMaterializer;

impl FsFileMaterializer {
    pub fn new() -> Self {
        Self
    }
}

/// Encodes bytes as a `data:<mime>;base64,<payload>` URL.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[async_trait]
impl FileMaterializer for FsFileMaterializer {
    async fn materialize(&self, file: &ReferenceFile) -> Result<ReferenceImage> {
        let name = file.display_name();

        let (mime_type, bytes) = match file {
            ReferenceFile::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| ParaImageError::reference(&name, e.to_string()))?;
                let mime = mime_guess::from_path(path)
                    .first_raw()
                    .unwrap_or(FALLBACK_MIME)
                    .to_string();
                (mime, bytes)
            }
            ReferenceFile::Bytes {
                mime_type, bytes, ..
            } => {
                let mime = mime_type
                    .clone()
                    .or_else(|| mime_guess::from_path(&name).first_raw().map(str::to_string))
                    .unwrap_or_else(|| FALLBACK_MIME.to_string());
                (mime, bytes.clone())
            }
        };

        if bytes.is_empty() {
            return Err(ParaImageError::reference(&name, "file is empty"));
        }

        tracing::debug!(
            "[FsFileMaterializer] Materialized '{}' ({} bytes, {})",
            name,
            bytes.len(),
            mime_type
        );
        Ok(ReferenceImage::new(name, to_data_url(&mime_type, &bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_path_is_encoded_with_guessed_mime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cat.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let image = FsFileMaterializer::new()
            .materialize(&ReferenceFile::Path(path))
            .await
            .unwrap();

        assert_eq!(image.name, "cat.png");
        assert_eq!(image.data_url, "data:image/png;base64,AQID");
    }

    #[tokio::test]
    async fn test_missing_file_is_reference_error() {
        let err = FsFileMaterializer::new()
            .materialize(&ReferenceFile::Path(PathBuf::from("/nonexistent/x.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, ParaImageError::Reference { ref name, .. } if name == "x.png"));
    }

    #[tokio::test]
    async fn test_bytes_use_declared_mime() {
        let image = FsFileMaterializer::new()
            .materialize(&ReferenceFile::Bytes {
                name: "clip".to_string(),
                mime_type: Some("image/webp".to_string()),
                bytes: vec![255],
            })
            .await
            .unwrap();
        assert_eq!(image.mime_type(), Some("image/webp"));
    }

    #[tokio::test]
    async fn test_empty_bytes_are_rejected() {
        let result = FsFileMaterializer::new()
            .materialize(&ReferenceFile::Bytes {
                name: "empty.png".to_string(),
                mime_type: None,
                bytes: vec![],
            })
            .await;
        assert!(result.is_err());
    }
}

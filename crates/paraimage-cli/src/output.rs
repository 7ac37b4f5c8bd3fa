//! Writes generated images to disk.

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};

/// Saves a generated image under `dir` as `<stem>.<ext>`.
///
/// Data URLs are decoded in place. Remote URLs are downloaded with `client`,
/// taking the extension from the response `Content-Type`.
pub async fn save_image(client: &Client, dir: &Path, stem: &str, url: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let (extension, bytes) = match parse_data_url(url) {
        Some((mime, payload)) => {
            let bytes = STANDARD
                .decode(payload)
                .context("Generated image is not valid base64")?;
            (extension_for(mime), bytes)
        }
        None if url.starts_with("data:") => bail!("Unsupported data URL in generated image"),
        None if url.starts_with("http://") || url.starts_with("https://") => {
            download(client, url).await?
        }
        None => bail!("Unsupported image URL: {}", url),
    };

    let path = dir.join(format!("{}.{}", sanitize(stem), extension));
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

async fn download(client: &Client, url: &str) -> Result<(String, Vec<u8>)> {
    tracing::debug!("[Output] Downloading {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?
        .error_for_status()
        .with_context(|| format!("Failed to download {}", url))?;

    let mime = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());
    let extension = match mime {
        Some(mime) if !mime.is_empty() && mime != "application/octet-stream" => {
            extension_for(&mime)
        }
        _ => mime_guess::from_path(url_path(url))
            .first_raw()
            .map(extension_for)
            .unwrap_or_else(|| "bin".to_string()),
    };

    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read image body from {}", url))?;
    Ok((extension, bytes.to_vec()))
}

fn url_path(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

fn extension_for(mime: &str) -> String {
    match mime {
        "image/jpeg" => "jpg".to_string(),
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| "bin".to_string()),
    }
}

/// Turns a model key like `Google Gemini::nano-banana` into a file-name stem.
pub fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

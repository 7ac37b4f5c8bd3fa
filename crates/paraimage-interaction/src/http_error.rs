//! Shared HTTP error mapping for image backends.

use paraimage_core::GenerationError;
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorField,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Body(ErrorBody),
    Text(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Turns a non-success response into a provider failure carrying the
/// provider's own message when the body has one.
pub(crate) fn map_http_error(backend: &str, status: StatusCode, body: String) -> GenerationError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .ok()
        .and_then(|wrapper| match wrapper.error {
            ErrorField::Text(text) => Some(text),
            ErrorField::Body(error) => {
                let message = error.message?;
                match error.status.filter(|s| !s.is_empty()) {
                    Some(status_text) => Some(format!("{status_text}: {message}")),
                    None => Some(message),
                }
            }
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("{backend} request failed with status {}", status.as_u16())
            } else {
                trimmed.to_string()
            }
        });

    GenerationError::Provider {
        status: Some(status.as_u16()),
        message,
    }
}

pub(crate) fn map_transport_error(err: reqwest::Error) -> GenerationError {
    GenerationError::Transport(err.to_string())
}

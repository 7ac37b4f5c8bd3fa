//! GeminiImageAgent - native `generateContent` image generation.
//!
//! Used for Gemini providers configured without a base URL. Reference images
//! travel as inline data parts next to the prompt.

use crate::http_error::{map_http_error, map_transport_error};
use paraimage_core::{GeneratedImage, GenerationError, ReferenceImage};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Talks to the Gemini REST API directly.
#[derive(Clone)]
pub struct GeminiImageAgent {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GeminiImageAgent {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api_base: GEMINI_API_BASE.to_string(),
        }
    }

    /// Points the agent at another API root (local mocks).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn generate(
        &self,
        model_id: &str,
        prompt: &str,
        references: &[ReferenceImage],
    ) -> Result<GeneratedImage, GenerationError> {
        if self.api_key.trim().is_empty() {
            return Err(GenerationError::Configuration("api key is required".into()));
        }

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: build_parts(prompt, references)?,
            }],
        };

        tracing::debug!(
            "[GeminiImageAgent] generateContent model={} prompt_len={} references={}",
            model_id,
            prompt.len(),
            references.len()
        );

        let url = format!("{}/models/{}:generateContent", self.api_base, model_id);
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error("Gemini", status, body_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            GenerationError::InvalidResponse(format!("failed to parse Gemini response: {err}"))
        })?;

        extract_inline_image(parsed)
    }
}

fn build_parts(prompt: &str, references: &[ReferenceImage]) -> Result<Vec<Part>, GenerationError> {
    let mut parts = vec![Part::Text {
        text: prompt.to_string(),
    }];

    for reference in references {
        let data = reference.base64_payload().ok_or_else(|| {
            GenerationError::InvalidResponse("unsupported reference image format".into())
        })?;
        let mime_type = reference
            .mime_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        parts.push(Part::InlineData {
            inline_data: InlineDataPayload {
                mime_type,
                data: data.to_string(),
            },
        });
    }

    Ok(parts)
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineDataPayload>,
}

fn extract_inline_image(response: GenerateContentResponse) -> Result<GeneratedImage, GenerationError> {
    response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.inline_data)
        .find(|inline| !inline.data.is_empty())
        .map(|inline| {
            let mime = if inline.mime_type.is_empty() {
                DEFAULT_IMAGE_MIME
            } else {
                inline.mime_type.as_str()
            };
            GeneratedImage::new(format!("data:{};base64,{}", mime, inline.data))
        })
        .ok_or_else(|| GenerationError::InvalidResponse("no image data returned".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_carry_references_inline() {
        let refs = vec![ReferenceImage::new("a.jpg", "data:image/jpeg;base64,QUJD")];
        let parts = build_parts("a cat", &refs).unwrap();
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"text": "a cat"},
                {"inlineData": {"mimeType": "image/jpeg", "data": "QUJD"}}
            ])
        );
    }

    #[test]
    fn test_non_data_url_reference_is_rejected() {
        let refs = vec![ReferenceImage::new("remote", "https://example.com/a.png")];
        let err = build_parts("x", &refs).unwrap_err();
        assert_eq!(err.to_string(), "unsupported reference image format");
    }

    #[test]
    fn test_first_inline_part_wins() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "here you go"},
                    {"inlineData": {"data": "AAAA"}},
                    {"inlineData": {"mimeType": "image/webp", "data": "BBBB"}}
                ]}
            }]
        }))
        .unwrap();

        let image = extract_inline_image(response).unwrap();
        assert_eq!(image.url, "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_text_only_response_has_no_image() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "I cannot draw that"}]}}]
        }))
        .unwrap();
        let err = extract_inline_image(response).unwrap_err();
        assert_eq!(err.to_string(), "no image data returned");
    }
}

//! OpenAiImageAgent - OpenAI-compatible `/images/generations` endpoint.
//!
//! Serves OpenAI itself plus compatible gateways (Seedream/Ark, DashScope,
//! AIHubMix, Gemini's OpenAI surface). Seedream endpoints get their own size
//! vocabulary and accept reference images.

use crate::http_error::{map_http_error, map_transport_error};
use crate::provider_hints::{
    DEFAULT_OPENAI_BASE_URL, DEFAULT_SEEDREAM_BASE_URL, is_gpt_image_model,
    supports_seedream_sequence,
};
use paraimage_core::{GeneratedImage, GenerationError, ReferenceImage};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const IMAGES_PATH: &str = "/images/generations";
const DEFAULT_SQUARE_SIZE: u32 = 512;
const DEFAULT_SEEDREAM_SIZE: &str = "2048x2048";
const DEFAULT_GPT_IMAGE_SIZE: &str = "1024x1024";

/// Talks to an OpenAI-compatible image endpoint.
#[derive(Clone)]
pub struct OpenAiImageAgent {
    client: Client,
    api_key: String,
    base_url: String,
    seedream: bool,
}

impl OpenAiImageAgent {
    /// Creates an agent for a generic OpenAI-compatible endpoint.
    pub fn new(client: Client, api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: normalize_openai_base_url(base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            seedream: false,
        }
    }

    /// Creates an agent for a Seedream (Volcengine Ark) endpoint.
    pub fn seedream(client: Client, api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: normalize_seedream_base_url(base_url),
            seedream: true,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, IMAGES_PATH)
    }

    pub async fn generate(
        &self,
        model_id: &str,
        prompt: &str,
        references: &[ReferenceImage],
        size: Option<&str>,
    ) -> Result<GeneratedImage, GenerationError> {
        let body = self.build_body(model_id, prompt, references, size);

        tracing::debug!(
            "[OpenAiImageAgent] POST {} model={} seedream={} references={}",
            self.endpoint(),
            model_id,
            self.seedream,
            references.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body_text = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_http_error("OpenAI", status, body_text));
        }

        let parsed: serde_json::Value = serde_json::from_str(&body_text).map_err(|_| {
            GenerationError::InvalidResponse("unknown image response format".into())
        })?;
        extract_image(parsed, self.output_mime())
    }

    fn output_mime(&self) -> &'static str {
        if self.seedream { "image/jpeg" } else { "image/png" }
    }

    fn build_body(
        &self,
        model_id: &str,
        prompt: &str,
        references: &[ReferenceImage],
        size: Option<&str>,
    ) -> ImageGenerationBody {
        let mut body = ImageGenerationBody {
            model: model_id.to_string(),
            prompt: prompt.to_string(),
            ..Default::default()
        };

        if self.seedream {
            body.response_format = Some("b64_json");
            body.size = Some(resolve_seedream_size(size));
            body.watermark = Some(false);
            body.image = match references {
                [] => None,
                [single] => Some(ImageInput::Single(single.data_url.clone())),
                many => Some(ImageInput::Many(
                    many.iter().map(|r| r.data_url.clone()).collect(),
                )),
            };
            if supports_seedream_sequence(model_id) {
                body.sequential_image_generation = Some("disabled");
            }
        } else if is_gpt_image_model(model_id) {
            body.n = Some(1);
            body.quality = Some("medium");
            body.size = Some(resolve_gpt_image_size(size));
        } else {
            let edge = resolve_square_size(size);
            body.response_format = Some("b64_json");
            body.size = Some(format!("{edge}x{edge}"));
        }

        body
    }
}

#[derive(Serialize, Default)]
struct ImageGenerationBody {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<ImageInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    watermark: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequential_image_generation: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ImageInput {
    Single(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

fn extract_image(
    payload: serde_json::Value,
    mime_type: &str,
) -> Result<GeneratedImage, GenerationError> {
    if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| match error {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            });
        return Err(GenerationError::Provider {
            status: None,
            message,
        });
    }

    let Some(data) = payload.get("data").and_then(|d| d.as_array()) else {
        return Err(GenerationError::InvalidResponse(
            "unknown image response format".into(),
        ));
    };
    let Some(first) = data.first() else {
        return Err(GenerationError::InvalidResponse("no image data returned".into()));
    };

    let datum: ImageDatum = serde_json::from_value(first.clone()).map_err(|_| {
        GenerationError::InvalidResponse("unknown image response format".into())
    })?;

    match (datum.b64_json, datum.url) {
        (Some(b64), _) if !b64.is_empty() => Ok(GeneratedImage::new(format!(
            "data:{mime_type};base64,{b64}"
        ))),
        (_, Some(url)) if !url.is_empty() => Ok(GeneratedImage::new(url)),
        _ => Err(GenerationError::InvalidResponse(
            "unknown image response format".into(),
        )),
    }
}

/// Square edge length for generic endpoints: `"768x512"` → 768, `"640"` → 640.
fn resolve_square_size(size: Option<&str>) -> u32 {
    let Some(raw) = size.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_SQUARE_SIZE;
    };
    let lowered = raw.to_lowercase();
    let head = lowered.split('x').next().unwrap_or_default().trim();
    head.parse().unwrap_or(DEFAULT_SQUARE_SIZE)
}

fn resolve_seedream_size(size: Option<&str>) -> String {
    let Some(raw) = size.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_SEEDREAM_SIZE.to_string();
    };
    let lowered = raw.to_lowercase();
    match lowered.as_str() {
        "2k" | "4k" => lowered.to_uppercase(),
        s if s.contains('x') => s.to_string(),
        s if s.chars().all(|c| c.is_ascii_digit()) => format!("{s}x{s}"),
        _ => DEFAULT_SEEDREAM_SIZE.to_string(),
    }
}

fn resolve_gpt_image_size(size: Option<&str>) -> String {
    let Some(raw) = size.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_GPT_IMAGE_SIZE.to_string();
    };
    let lowered = raw.to_lowercase();
    if lowered.contains('x') {
        lowered
    } else if lowered.chars().all(|c| c.is_ascii_digit()) {
        format!("{lowered}x{lowered}")
    } else {
        DEFAULT_GPT_IMAGE_SIZE.to_string()
    }
}

fn strip_endpoint_suffix(base_url: &str) -> &str {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix(IMAGES_PATH)
        .unwrap_or(trimmed)
        .trim_end_matches('/')
}

/// Normalizes a user-entered base URL; `None` means "use the OpenAI default".
///
/// A bare host (`https://gateway.local`) gets the conventional `/v1` root.
fn normalize_openai_base_url(base_url: &str) -> Option<String> {
    let stripped = strip_endpoint_suffix(base_url);
    if stripped.is_empty() {
        return None;
    }
    let has_path = stripped
        .split_once("://")
        .map(|(_, rest)| rest.contains('/'))
        .unwrap_or(true);
    if has_path {
        Some(stripped.to_string())
    } else {
        Some(format!("{stripped}/v1"))
    }
}

fn normalize_seedream_base_url(base_url: &str) -> String {
    let stripped = strip_endpoint_suffix(base_url);
    if stripped.is_empty() {
        DEFAULT_SEEDREAM_BASE_URL.to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn refs(n: usize) -> Vec<ReferenceImage> {
        (0..n)
            .map(|i| ReferenceImage::new(format!("r{i}.png"), format!("data:image/png;base64,R{i}")))
            .collect()
    }

    #[test]
    fn test_size_resolution() {
        assert_eq!(resolve_square_size(None), 512);
        assert_eq!(resolve_square_size(Some("768x512")), 768);
        assert_eq!(resolve_square_size(Some("640")), 640);
        assert_eq!(resolve_square_size(Some("huge")), 512);

        assert_eq!(resolve_seedream_size(None), "2048x2048");
        assert_eq!(resolve_seedream_size(Some("4k")), "4K");
        assert_eq!(resolve_seedream_size(Some("1024X768")), "1024x768");
        assert_eq!(resolve_seedream_size(Some("1536")), "1536x1536");

        assert_eq!(resolve_gpt_image_size(None), "1024x1024");
        assert_eq!(resolve_gpt_image_size(Some("1536x1024")), "1536x1024");
        assert_eq!(resolve_gpt_image_size(Some("1024")), "1024x1024");
    }

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(normalize_openai_base_url(""), None);
        assert_eq!(
            normalize_openai_base_url("https://gateway.local/"),
            Some("https://gateway.local/v1".to_string())
        );
        assert_eq!(
            normalize_openai_base_url("https://aihubmix.com/v1/images/generations"),
            Some("https://aihubmix.com/v1".to_string())
        );
        assert_eq!(normalize_seedream_base_url("  "), DEFAULT_SEEDREAM_BASE_URL);
        assert_eq!(
            normalize_seedream_base_url("https://ark.example.com/api/v3/images/generations/"),
            "https://ark.example.com/api/v3"
        );
    }

    #[test]
    fn test_seedream_body_with_single_and_many_references() {
        let agent = OpenAiImageAgent::seedream(Client::new(), "k", "");

        let single = agent.build_body("doubao-seedream-4-0-250828", "cat", &refs(1), None);
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            json!({
                "model": "doubao-seedream-4-0-250828",
                "prompt": "cat",
                "size": "2048x2048",
                "response_format": "b64_json",
                "image": "data:image/png;base64,R0",
                "watermark": false,
                "sequential_image_generation": "disabled"
            })
        );

        let many = agent.build_body("doubao-seededit-3-0", "cat", &refs(2), Some("2k"));
        let value = serde_json::to_value(&many).unwrap();
        assert_eq!(value["image"], json!(["data:image/png;base64,R0", "data:image/png;base64,R1"]));
        assert_eq!(value["size"], json!("2K"));
        assert!(value.get("sequential_image_generation").is_none());
    }

    #[test]
    fn test_gpt_image_body() {
        let agent = OpenAiImageAgent::new(Client::new(), "k", "");
        let body = agent.build_body("gpt-image-1", "cat", &refs(1), None);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "gpt-image-1",
                "prompt": "cat",
                "n": 1,
                "size": "1024x1024",
                "quality": "medium"
            })
        );
        assert_eq!(agent.endpoint(), "https://api.openai.com/v1/images/generations");
    }

    #[test]
    fn test_generic_body_uses_square_size() {
        let agent = OpenAiImageAgent::new(Client::new(), "k", "https://dashscope.aliyuncs.com/api/v1");
        let body = agent.build_body("qwen-image", "cat", &[], Some("768x512"));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["size"], json!("768x768"));
        assert_eq!(value["response_format"], json!("b64_json"));
    }

    #[test]
    fn test_extract_image_shapes() {
        let image = extract_image(json!({"data": [{"b64_json": "AAAA"}]}), "image/png").unwrap();
        assert_eq!(image.url, "data:image/png;base64,AAAA");

        let image = extract_image(json!({"data": [{"url": "https://cdn/x.png"}]}), "image/png").unwrap();
        assert_eq!(image.url, "https://cdn/x.png");

        let err = extract_image(json!({"data": []}), "image/png").unwrap_err();
        assert_eq!(err.to_string(), "no image data returned");

        let err = extract_image(json!({"images": []}), "image/png").unwrap_err();
        assert_eq!(err.to_string(), "unknown image response format");

        let err = extract_image(json!({"error": {"message": "content policy"}}), "image/png").unwrap_err();
        assert_eq!(err.to_string(), "content policy");
    }
}

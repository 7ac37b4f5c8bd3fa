//! Routes a generation request to the backend its provider speaks.

use crate::gemini_image_agent::GeminiImageAgent;
use crate::openai_image_agent::OpenAiImageAgent;
use crate::provider_hints::{
    is_gemini_provider, is_seedream_provider, resolve_default_base_url,
    resolve_provider_model_id,
};
use async_trait::async_trait;
use paraimage_core::{
    GeneratedImage, GenerationError, GenerationRequest, ImageGenerator, ProviderSettings,
    ProviderSettingsRepository,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// The production [`ImageGenerator`].
///
/// Looks up the provider's settings on every call, so edits to the provider
/// list apply to the next generation without a restart.
///
/// Routing:
/// - Gemini providers without a base URL use the native `generateContent` API
/// - Seedream endpoints use the OpenAI-compatible API with Seedream parameters
/// - Everything else uses the OpenAI-compatible API
pub struct ProviderImageGenerator {
    settings: Arc<dyn ProviderSettingsRepository>,
    client: Client,
    gemini_api_base: Option<String>,
}

impl ProviderImageGenerator {
    pub fn new(settings: Arc<dyn ProviderSettingsRepository>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(settings, client)
    }

    pub fn with_client(settings: Arc<dyn ProviderSettingsRepository>, client: Client) -> Self {
        Self {
            settings,
            client,
            gemini_api_base: None,
        }
    }

    /// Overrides the native Gemini API root (local mocks).
    pub fn with_gemini_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.gemini_api_base = Some(api_base.into());
        self
    }

    async fn load_settings(&self, provider_name: &str) -> Result<ProviderSettings, GenerationError> {
        let settings = self
            .settings
            .find_by_name(provider_name)
            .await
            .map_err(|e| {
                GenerationError::Configuration(format!("failed to load provider settings: {e}"))
            })?;

        settings
            .filter(|s| !s.api_key.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::Configuration("provider config not found or apiKey missing".into())
            })
    }

    fn gemini_agent(&self, api_key: &str) -> GeminiImageAgent {
        let agent = GeminiImageAgent::new(self.client.clone(), api_key);
        match &self.gemini_api_base {
            Some(base) => agent.with_api_base(base.clone()),
            None => agent,
        }
    }
}

#[async_trait]
impl ImageGenerator for ProviderImageGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, GenerationError> {
        let settings = self.load_settings(&request.provider_name).await?;
        let provider_name = settings.provider_name.as_str();
        let model_id = resolve_provider_model_id(provider_name, &request.model_id);
        let configured_base = settings.base_url.trim();

        if configured_base.is_empty() && is_gemini_provider(provider_name) {
            tracing::info!(
                "[ProviderImageGenerator] {} / {} via Gemini native API",
                provider_name,
                model_id
            );
            return self
                .gemini_agent(&settings.api_key)
                .generate(&model_id, &request.prompt, &request.references)
                .await;
        }

        let base_url = if configured_base.is_empty() {
            resolve_default_base_url(provider_name, &model_id).ok_or_else(|| {
                GenerationError::Configuration("baseUrl missing for provider".into())
            })?
        } else {
            configured_base
        };

        let agent = if is_seedream_provider(provider_name, base_url, &model_id) {
            OpenAiImageAgent::seedream(self.client.clone(), settings.api_key.clone(), base_url)
        } else {
            OpenAiImageAgent::new(self.client.clone(), settings.api_key.clone(), base_url)
        };

        tracing::info!(
            "[ProviderImageGenerator] {} / {} via {}",
            provider_name,
            model_id,
            agent.endpoint()
        );

        agent
            .generate(
                &model_id,
                &request.prompt,
                &request.references,
                request.size.as_deref(),
            )
            .await
    }
}

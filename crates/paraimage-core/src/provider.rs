//! Provider configuration types and the repository/source traits around them.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The part of a provider's configuration the model registry cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_name: String,
    #[serde(default)]
    pub model_ids: Vec<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Full settings for one provider, including credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Unique provider name (e.g. "OpenAI", "Google Gemini")
    pub provider_name: String,
    /// API key used to authenticate against the provider
    pub api_key: String,
    /// Base URL; empty means "infer from the provider name"
    #[serde(default)]
    pub base_url: String,
    /// Model identifiers offered by this provider
    #[serde(default)]
    pub model_ids: Vec<String>,
    /// Optional icon reference shown next to the provider's models
    #[serde(default)]
    pub icon: Option<String>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl ProviderSettings {
    /// Creates settings with normalized fields and the current timestamp.
    pub fn new(
        provider_name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model_ids: Vec<String>,
    ) -> Self {
        Self {
            provider_name: provider_name.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            base_url: base_url.into().trim().to_string(),
            model_ids: normalize_model_ids(&model_ids),
            icon: None,
            updated_at: Utc::now(),
        }
    }

    pub fn to_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider_name: self.provider_name.clone(),
            model_ids: self.model_ids.clone(),
            icon: self.icon.clone(),
        }
    }
}

/// Trims model identifiers and drops blank ones.
pub fn normalize_model_ids(model_ids: &[String]) -> Vec<String> {
    model_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Source of provider configurations, read on demand by the model registry.
#[async_trait]
pub trait ProviderConfigSource: Send + Sync {
    /// Lists the configuration of every known provider.
    async fn list_provider_configs(&self) -> Result<Vec<ProviderConfig>>;
}

/// An abstract repository for provider settings.
///
/// Implementations decide where settings live (a TOML file, a keychain, ...).
#[async_trait]
pub trait ProviderSettingsRepository: Send + Sync {
    /// Lists all providers, most recently updated first.
    async fn list_all(&self) -> Result<Vec<ProviderSettings>>;

    /// Finds a provider by name (exact match after trimming).
    async fn find_by_name(&self, provider_name: &str) -> Result<Option<ProviderSettings>>;

    /// Inserts or replaces the provider with the same name.
    ///
    /// Returns the stored settings (normalized, with a fresh `updated_at`).
    async fn save(&self, settings: ProviderSettings) -> Result<ProviderSettings>;

    /// Removes a provider. Returns `true` if something was removed.
    async fn delete(&self, provider_name: &str) -> Result<bool>;
}

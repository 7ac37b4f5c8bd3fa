//! `config.toml` DTOs.

use chrono::{DateTime, Utc};
use paraimage_core::ProviderSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigRoot {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default, rename = "provider", skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderEntry>,
    #[serde(default, rename = "prompt", skip_serializing_if = "Vec::is_empty")]
    pub prompts: Vec<PromptEntry>,
}

/// `[app]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

/// One `[[provider]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&ProviderSettings> for ProviderEntry {
    fn from(settings: &ProviderSettings) -> Self {
        Self {
            name: settings.provider_name.clone(),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            models: settings.model_ids.clone(),
            icon: settings.icon.clone(),
            updated_at: Some(settings.updated_at),
        }
    }
}

impl ProviderEntry {
    /// Converts into domain settings. Hand-edited entries without a timestamp
    /// sort as the oldest.
    pub fn into_domain(self) -> ProviderSettings {
        ProviderSettings {
            provider_name: self.name.trim().to_string(),
            api_key: self.api_key.trim().to_string(),
            base_url: self.base_url.trim().to_string(),
            model_ids: paraimage_core::provider::normalize_model_ids(&self.models),
            icon: self.icon,
            updated_at: self.updated_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }
}

/// One `[[prompt]]` table of the prompt library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub name: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

//! TOML-based provider settings repository.

use crate::dto::{ConfigRoot, ProviderEntry};
use crate::paths::ParaImagePaths;
use crate::storage::AtomicFile;
use async_trait::async_trait;
use chrono::Utc;
use paraimage_core::error::{ParaImageError, Result};
use paraimage_core::provider::normalize_model_ids;
use paraimage_core::{
    ProviderConfig, ProviderConfigSource, ProviderSettings, ProviderSettingsRepository,
};
use std::path::PathBuf;

/// Stores provider settings as `[[provider]]` tables in `config.toml`.
///
/// Responsibilities:
/// - Load/save providers through an [`AtomicFile`]
/// - Normalize names and model ids on save
/// - Leave the `[app]` table untouched
pub struct TomlProviderRepository {
    file: AtomicFile<ConfigRoot>,
}

impl TomlProviderRepository {
    /// Creates a repository with the default config path.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(ParaImagePaths::config_file()?))
    }

    /// Creates a repository with a custom config path (for testing)
    pub fn with_path(config_path: PathBuf) -> Self {
        Self {
            file: AtomicFile::toml(config_path),
        }
    }

    fn load_entries(&self) -> Result<Vec<ProviderEntry>> {
        Ok(self
            .file
            .load()?
            .map(|root| root.providers)
            .unwrap_or_default())
    }
}

#[async_trait]
impl ProviderSettingsRepository for TomlProviderRepository {
    async fn list_all(&self) -> Result<Vec<ProviderSettings>> {
        let mut providers: Vec<ProviderSettings> = self
            .load_entries()?
            .into_iter()
            .map(ProviderEntry::into_domain)
            .filter(|p| !p.provider_name.is_empty())
            .collect();
        providers.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(providers)
    }

    async fn find_by_name(&self, provider_name: &str) -> Result<Option<ProviderSettings>> {
        let name = provider_name.trim();
        Ok(self
            .load_entries()?
            .into_iter()
            .map(ProviderEntry::into_domain)
            .find(|p| p.provider_name == name))
    }

    async fn save(&self, settings: ProviderSettings) -> Result<ProviderSettings> {
        let provider_name = settings.provider_name.trim().to_string();
        if provider_name.is_empty() {
            return Err(ParaImageError::config("Provider name is required"));
        }

        let stored = ProviderSettings {
            provider_name,
            api_key: settings.api_key.trim().to_string(),
            base_url: settings.base_url.trim().to_string(),
            model_ids: normalize_model_ids(&settings.model_ids),
            icon: settings.icon,
            updated_at: Utc::now(),
        };

        let entry = ProviderEntry::from(&stored);
        self.file.update(ConfigRoot::default(), |root| {
            match root
                .providers
                .iter_mut()
                .find(|p| p.name.trim() == stored.provider_name)
            {
                Some(existing) => *existing = entry,
                None => root.providers.push(entry),
            }
            Ok(())
        })?;

        tracing::info!(
            "[TomlProviderRepository] Saved provider '{}' ({} model(s))",
            stored.provider_name,
            stored.model_ids.len()
        );
        Ok(stored)
    }

    async fn delete(&self, provider_name: &str) -> Result<bool> {
        let name = provider_name.trim();
        self.file.update(ConfigRoot::default(), |root| {
            let before = root.providers.len();
            root.providers.retain(|p| p.name.trim() != name);
            Ok(root.providers.len() != before)
        })
    }
}

#[async_trait]
impl ProviderConfigSource for TomlProviderRepository {
    async fn list_provider_configs(&self) -> Result<Vec<ProviderConfig>> {
        // Declaration order drives model order, so no re-sorting here
        Ok(self
            .load_entries()?
            .into_iter()
            .map(|entry| entry.into_domain().to_config())
            .collect())
    }
}

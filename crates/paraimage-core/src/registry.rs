//! Model registry.
//!
//! Derives the flat list of addressable models from provider configurations.
//! The registry is never mutated: every provider change rebuilds it from
//! scratch via [`ModelRegistry::from_providers`].

use crate::provider::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Separator between provider name and model identifier inside a model key.
pub const MODEL_KEY_SEPARATOR: &str = "::";

/// One addressable generation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Globally unique key (`provider::model-id`)
    pub key: String,
    /// Backend-specific model identifier sent to the provider
    pub model_id: String,
    /// Human-readable label
    pub label: String,
    /// Name of the provider offering this model
    pub provider_name: String,
    /// Optional icon reference
    #[serde(default)]
    pub icon: Option<String>,
}

/// Builds the unique key for a model offered by a provider.
///
/// The same model identifier may be offered by two providers, so the key
/// always carries the provider name.
pub fn model_key(provider_name: &str, model_id: &str) -> String {
    format!("{provider_name}{MODEL_KEY_SEPARATOR}{model_id}")
}

/// Derives the ordered list of models from provider configurations.
///
/// Providers with a blank name are skipped, model identifiers are trimmed and
/// blank entries discarded. Duplicate keys keep their first occurrence, so the
/// result follows provider order, then per-provider declaration order.
pub fn build_model_list(providers: &[ProviderConfig]) -> Vec<Model> {
    let mut seen = HashSet::new();
    let mut models = Vec::new();

    for provider in providers {
        let provider_name = provider.provider_name.trim();
        if provider_name.is_empty() {
            continue;
        }

        for raw_id in &provider.model_ids {
            let model_id = raw_id.trim();
            if model_id.is_empty() {
                continue;
            }

            let key = model_key(provider_name, model_id);
            if !seen.insert(key.clone()) {
                continue;
            }

            models.push(Model {
                key,
                model_id: model_id.to_string(),
                label: model_id.to_string(),
                provider_name: provider_name.to_string(),
                icon: provider.icon.clone(),
            });
        }
    }

    models
}

/// Indexes models by key.
pub fn build_model_map(models: &[Model]) -> HashMap<String, Model> {
    models
        .iter()
        .map(|model| (model.key.clone(), model.clone()))
        .collect()
}

/// Immutable snapshot of the models currently addressable.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<Model>,
    by_key: HashMap<String, Model>,
}

impl ModelRegistry {
    /// Builds a registry from provider configurations.
    pub fn from_providers(providers: &[ProviderConfig]) -> Self {
        Self::from_models(build_model_list(providers))
    }

    /// Builds a registry from an already derived model list.
    pub fn from_models(models: Vec<Model>) -> Self {
        let by_key = build_model_map(&models);
        Self { models, by_key }
    }

    /// All models in registry order.
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn get(&self, key: &str) -> Option<&Model> {
        self.by_key.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Deterministic default model for the window at `index`.
    pub fn fallback_for_position(&self, index: usize) -> Option<&Model> {
        if self.models.is_empty() {
            return None;
        }
        self.models.get(index % self.models.len())
    }
}

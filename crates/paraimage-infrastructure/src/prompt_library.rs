//! Saved prompts, stored as `[[prompt]]` tables in `config.toml`.

use crate::dto::{ConfigRoot, PromptEntry};
use crate::paths::ParaImagePaths;
use crate::storage::AtomicFile;
use chrono::{DateTime, Utc};
use paraimage_core::error::{ParaImageError, Result};
use std::path::PathBuf;

/// A named prompt kept for reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPrompt {
    pub name: String,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

impl From<PromptEntry> for SavedPrompt {
    fn from(entry: PromptEntry) -> Self {
        Self {
            name: entry.name.trim().to_string(),
            text: entry.text,
            updated_at: entry.updated_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }
}

/// Prompt library backed by `config.toml`.
///
/// Names are unique after trimming; saving an existing name replaces its
/// text in place. Other tables in the file are left untouched.
pub struct TomlPromptLibrary {
    file: AtomicFile<ConfigRoot>,
}

impl TomlPromptLibrary {
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(ParaImagePaths::config_file()?))
    }

    /// Creates a library with a custom config path (for testing)
    pub fn with_path(config_path: PathBuf) -> Self {
        Self {
            file: AtomicFile::toml(config_path),
        }
    }

    /// Saved prompts in file order.
    pub fn list(&self) -> Result<Vec<SavedPrompt>> {
        Ok(self
            .file
            .load()?
            .map(|root| root.prompts)
            .unwrap_or_default()
            .into_iter()
            .map(SavedPrompt::from)
            .filter(|p| !p.name.is_empty())
            .collect())
    }

    pub fn find(&self, name: &str) -> Result<Option<SavedPrompt>> {
        let name = name.trim();
        Ok(self.list()?.into_iter().find(|p| p.name == name))
    }

    /// Adds a prompt or replaces the text of the one with the same name.
    pub fn save(&self, name: &str, text: &str) -> Result<SavedPrompt> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ParaImageError::config("Prompt name is required"));
        }
        if text.trim().is_empty() {
            return Err(ParaImageError::config("Prompt text is required"));
        }

        let entry = PromptEntry {
            name: name.to_string(),
            text: text.to_string(),
            updated_at: Some(Utc::now()),
        };
        let saved = SavedPrompt::from(entry.clone());

        self.file.update(ConfigRoot::default(), |root| {
            match root.prompts.iter_mut().find(|p| p.name.trim() == name) {
                Some(existing) => *existing = entry,
                None => root.prompts.push(entry),
            }
            Ok(())
        })?;

        tracing::info!("[TomlPromptLibrary] Saved prompt '{}'", saved.name);
        Ok(saved)
    }

    /// Returns whether a prompt was removed.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        self.file.update(ConfigRoot::default(), |root| {
            let before = root.prompts.len();
            root.prompts.retain(|p| p.name.trim() != name);
            Ok(root.prompts.len() != before)
        })
    }
}

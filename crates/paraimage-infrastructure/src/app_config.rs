//! Application settings from the `[app]` table of `config.toml`.

use crate::dto::{AppSection, ConfigRoot};
use crate::paths::ParaImagePaths;
use crate::storage::AtomicFile;
use paraimage_core::error::Result;
use paraimage_core::{MAX_LAYOUT_COUNT, MIN_LAYOUT_COUNT};
use std::path::PathBuf;

/// Number of windows shown when nothing is configured.
pub const DEFAULT_LAYOUT_COUNT: usize = 2;

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub layout_count: usize,
    pub image_size: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            layout_count: DEFAULT_LAYOUT_COUNT,
            image_size: None,
            output_dir: None,
        }
    }
}

impl From<AppSection> for AppConfig {
    fn from(section: AppSection) -> Self {
        Self {
            layout_count: section
                .layout_count
                .unwrap_or(DEFAULT_LAYOUT_COUNT)
                .clamp(MIN_LAYOUT_COUNT, MAX_LAYOUT_COUNT),
            image_size: section
                .image_size
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            output_dir: section.output_dir,
        }
    }
}

/// Reads the `[app]` table.
pub struct AppConfigService {
    file: AtomicFile<ConfigRoot>,
}

impl AppConfigService {
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(ParaImagePaths::config_file()?))
    }

    pub fn with_path(config_path: PathBuf) -> Self {
        Self {
            file: AtomicFile::toml(config_path),
        }
    }

    /// Loads settings; a missing file yields the defaults.
    pub fn load(&self) -> Result<AppConfig> {
        let section = self
            .file
            .load()?
            .map(|root| root.app)
            .unwrap_or_default();
        Ok(section.into())
    }
}

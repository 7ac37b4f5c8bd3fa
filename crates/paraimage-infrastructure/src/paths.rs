//! Unified path management for ParaImage files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/paraimage/          # Config directory ($PARAIMAGE_CONFIG_DIR)
//! └── config.toml               # [app] settings and [[provider]] tables
//!
//! ~/.local/share/paraimage/     # Data directory ($PARAIMAGE_DATA_DIR)
//! ├── sessions/                 # One JSON file per session
//! ├── outputs/                  # Images saved by the CLI
//! └── logs/                     # Application logs
//!     └── paraimage.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

const APP_DIR_NAME: &str = "paraimage";

/// Overrides the config directory.
pub const CONFIG_DIR_ENV: &str = "PARAIMAGE_CONFIG_DIR";
/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "PARAIMAGE_DATA_DIR";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for paraimage_core::ParaImageError {
    fn from(e: PathError) -> Self {
        paraimage_core::ParaImageError::config(e.to_string())
    }
}

/// Unified path management for ParaImage.
pub struct ParaImagePaths;

impl ParaImagePaths {
    /// Returns the configuration directory.
    ///
    /// `$PARAIMAGE_CONFIG_DIR` wins over the platform default.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        if let Some(dir) = env_dir(CONFIG_DIR_ENV) {
            return Ok(dir);
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the data directory.
    ///
    /// `$PARAIMAGE_DATA_DIR` wins over the platform default.
    pub fn data_dir() -> Result<PathBuf, PathError> {
        if let Some(dir) = env_dir(DATA_DIR_ENV) {
            return Ok(dir);
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn sessions_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("sessions"))
    }

    /// Default directory for images written by the CLI.
    pub fn outputs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("outputs"))
    }

    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("logs"))
    }
}

fn env_dir(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

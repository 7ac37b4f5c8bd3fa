//! Infrastructure layer for ParaImage.
//!
//! File-backed implementations of the collaborator traits defined in
//! `paraimage-core`: session storage, provider settings, reference image
//! materialization, plus path resolution, application config and the saved
//! prompt library.

pub mod app_config;
pub mod dir_session_repository;
pub mod dto;
pub mod file_materializer;
pub mod paths;
pub mod prompt_library;
pub mod storage;
pub mod toml_provider_repository;

pub use crate::app_config::{AppConfig, AppConfigService};
pub use crate::dir_session_repository::DirSessionRepository;
pub use crate::file_materializer::FsFileMaterializer;
pub use crate::paths::ParaImagePaths;
pub use crate::prompt_library::{SavedPrompt, TomlPromptLibrary};
pub use crate::toml_provider_repository::TomlProviderRepository;

//! Composition root: wires the concrete collaborators into an orchestrator.

use anyhow::{Context, Result};
use paraimage_application::{Orchestrator, OrchestratorDeps, OrchestratorHandle, OrchestratorOptions};
use paraimage_infrastructure::{
    AppConfig, AppConfigService, DirSessionRepository, FsFileMaterializer, ParaImagePaths,
    TomlPromptLibrary, TomlProviderRepository,
};
use paraimage_interaction::ProviderImageGenerator;
use std::path::PathBuf;
use std::sync::Arc;

pub struct AppContext {
    pub config: AppConfig,
    pub providers: Arc<TomlProviderRepository>,
    pub sessions: Arc<DirSessionRepository>,
    pub prompts: TomlPromptLibrary,
}

impl AppContext {
    pub async fn load() -> Result<Self> {
        let config = AppConfigService::new()
            .and_then(|service| service.load())
            .context("Failed to load config.toml")?;
        let providers =
            Arc::new(TomlProviderRepository::new().context("Failed to locate config.toml")?);
        let sessions = Arc::new(
            DirSessionRepository::default_location()
                .await
                .context("Failed to open the sessions directory")?,
        );

        let prompts = TomlPromptLibrary::new().context("Failed to locate config.toml")?;

        Ok(Self {
            config,
            providers,
            sessions,
            prompts,
        })
    }

    /// Starts an orchestrator; `layout_count` overrides the configured one.
    pub fn spawn_orchestrator(&self, layout_count: Option<usize>) -> OrchestratorHandle {
        let deps = OrchestratorDeps {
            generator: Arc::new(ProviderImageGenerator::new(self.providers.clone())),
            sessions: self.sessions.clone(),
            providers: self.providers.clone(),
            materializer: Arc::new(FsFileMaterializer::new()),
        };
        let options = OrchestratorOptions {
            layout_count: layout_count.unwrap_or(self.config.layout_count),
            image_size: self.config.image_size.clone(),
        };
        Orchestrator::spawn(deps, options)
    }

    /// `--out`, then `[app] output_dir`, then `<data>/outputs`.
    pub fn output_dir(&self, override_dir: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = override_dir.or_else(|| self.config.output_dir.clone()) {
            return Ok(dir);
        }
        Ok(ParaImagePaths::outputs_dir()?)
    }
}

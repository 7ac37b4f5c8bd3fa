use crate::context::AppContext;
use anyhow::{Context, Result};

pub async fn list(ctx: &AppContext) -> Result<()> {
    let handle = ctx.spawn_orchestrator(None);
    handle
        .refresh_providers()
        .await
        .context("Failed to load providers")?;
    let models = handle.models().await?;
    handle.shutdown();

    if models.is_empty() {
        println!("No models configured. Add a provider with `paraimage providers add`.");
        return Ok(());
    }

    for model in models {
        println!("{:<40} {}", model.key, model.label);
    }
    Ok(())
}

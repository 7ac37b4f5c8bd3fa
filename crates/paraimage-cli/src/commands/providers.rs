use crate::context::AppContext;
use anyhow::{Context, Result};
use paraimage_core::{ProviderSettings, ProviderSettingsRepository};

pub async fn list(ctx: &AppContext) -> Result<()> {
    let providers = ctx
        .providers
        .list_all()
        .await
        .context("Failed to read providers")?;

    if providers.is_empty() {
        println!("No providers configured. Add one with `paraimage providers add`.");
        return Ok(());
    }

    for provider in providers {
        let base_url = if provider.base_url.is_empty() {
            "(inferred)"
        } else {
            provider.base_url.as_str()
        };
        println!("{}", provider.provider_name);
        println!("  base url: {}", base_url);
        println!("  api key:  {}", mask_key(&provider.api_key));
        println!("  models:   {}", provider.model_ids.join(", "));
    }
    Ok(())
}

pub async fn add(
    ctx: &AppContext,
    name: String,
    api_key: String,
    base_url: String,
    models: Vec<String>,
    icon: Option<String>,
) -> Result<()> {
    let mut settings = ProviderSettings::new(name, api_key, base_url, models);
    settings.icon = icon;

    let saved = ctx
        .providers
        .save(settings)
        .await
        .context("Failed to save provider")?;

    println!(
        "Saved provider '{}' with {} model(s)",
        saved.provider_name,
        saved.model_ids.len()
    );
    Ok(())
}

pub async fn remove(ctx: &AppContext, name: &str) -> Result<()> {
    let removed = ctx
        .providers
        .delete(name)
        .await
        .context("Failed to remove provider")?;

    if removed {
        println!("Removed provider '{}'", name);
    } else {
        println!("No provider named '{}'", name);
    }
    Ok(())
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    if key.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", visible)
    }
}

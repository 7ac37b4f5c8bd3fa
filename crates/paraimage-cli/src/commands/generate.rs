use crate::context::AppContext;
use crate::output;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use paraimage_application::OrchestratorHandle;
use paraimage_core::{MAX_LAYOUT_COUNT, ReferenceFile, Window};
use reqwest::Client;
use std::path::PathBuf;

pub struct GenerateArgs {
    pub prompt: Option<String>,
    pub references: Vec<PathBuf>,
    pub models: Vec<String>,
    pub layout: Option<usize>,
    pub out: Option<PathBuf>,
    /// Stored conversation to append to.
    pub continue_session: Option<String>,
    /// Re-run the last prompt of the continued conversation.
    pub retry: bool,
}

pub async fn run(ctx: &AppContext, args: GenerateArgs) -> Result<()> {
    if args.models.len() > MAX_LAYOUT_COUNT {
        bail!("At most {} models can run side by side", MAX_LAYOUT_COUNT);
    }

    let layout = if args.continue_session.is_some() {
        Some(1)
    } else if args.models.is_empty() {
        args.layout
    } else {
        Some(args.models.len())
    };
    let handle = ctx.spawn_orchestrator(layout);
    let result = generate(ctx, &handle, args).await;
    handle.shutdown();
    result
}

async fn generate(ctx: &AppContext, handle: &OrchestratorHandle, args: GenerateArgs) -> Result<()> {
    let model_count = handle
        .refresh_providers()
        .await
        .context("Failed to load providers")?;
    if model_count == 0 {
        bail!("No models configured. Add a provider with `paraimage providers add`.");
    }

    if let Some(session_id) = args.continue_session.as_deref() {
        resume(handle, session_id).await?;
    } else if !args.models.is_empty() {
        bind_windows(handle, &args.models).await?;
    }

    let calls = if args.retry {
        retry_last_prompt(handle).await?
    } else {
        let prompt = args.prompt.unwrap_or_default();
        let files = args.references.into_iter().map(ReferenceFile::Path).collect();
        handle
            .submit(prompt, files)
            .await
            .context("Submission rejected")?
    };
    println!("Generating with {} model(s)...", calls);

    handle.wait_idle().await?;
    let windows = handle.windows().await?;

    let out_dir = ctx.output_dir(args.out)?;
    let stamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let client = Client::new();
    let mut failures = 0;

    for window in windows {
        let Some(model_key) = window.model_key.as_deref() else {
            continue;
        };
        let Some(reply) = window.messages.last().filter(|m| !m.is_user()) else {
            println!("{}: no result", model_key);
            continue;
        };

        if let Some(image) = reply.image() {
            let stem = format!("{}-{}", stamp, model_key);
            let path = output::save_image(&client, &out_dir, &stem, &image.url).await?;
            println!("{}: {}", model_key, path.display());
        } else if let Some(error) = reply.error() {
            failures += 1;
            println!("{}: failed: {}", model_key, error);
        }
        println!("  session {}", window.session_id);
    }

    if failures > 0 {
        tracing::warn!("[Generate] {} model(s) failed", failures);
    }
    Ok(())
}

/// Text of a prompt from the library.
pub fn saved_prompt(ctx: &AppContext, name: &str) -> Result<String> {
    match ctx.prompts.find(name).context("Failed to read the prompt library")? {
        Some(prompt) => Ok(prompt.text),
        None => bail!("No saved prompt named '{}'. Run `paraimage prompts list`.", name.trim()),
    }
}

async fn bind_windows(handle: &OrchestratorHandle, keys: &[String]) -> Result<()> {
    let models = handle.models().await?;
    for key in keys {
        if !models.iter().any(|m| &m.key == key) {
            bail!("Unknown model '{}'. Run `paraimage models` to list them.", key);
        }
    }

    let windows = handle.windows().await?;
    for (window, key) in windows.iter().zip(keys) {
        handle.rebind(window.id, key.clone()).await?;
    }
    Ok(())
}

/// Loads a stored conversation into the first window, bound to its model.
async fn resume(handle: &OrchestratorHandle, session_id: &str) -> Result<Window> {
    handle.hydrate_history().await?;
    handle.wait_idle().await?;

    let Some(session) = handle.find_session(session_id).await? else {
        bail!("No conversation with id '{}'", session_id);
    };
    if !handle.models().await?.iter().any(|m| m.key == session.model_key) {
        bail!(
            "Conversation {} belongs to '{}', which is no longer configured",
            session_id,
            session.model_key
        );
    }

    let window = handle
        .windows()
        .await?
        .into_iter()
        .next()
        .context("No window to continue in")?;
    if !handle.continue_session(window.id, session_id).await? {
        bail!("Failed to continue conversation {}", session_id);
    }

    tracing::info!("[Generate] Continuing {} with {}", session_id, session.model_key);
    let windows = handle.windows().await?;
    windows
        .into_iter()
        .find(|w| w.id == window.id)
        .context("Continued window disappeared")
}

async fn retry_last_prompt(handle: &OrchestratorHandle) -> Result<usize> {
    let windows = handle.windows().await?;
    let Some((window_id, message_id)) = windows
        .iter()
        .find_map(|w| last_prompt(w).map(|id| (w.id, id.to_string())))
    else {
        bail!("Nothing to retry: the conversation has no prompt");
    };

    if !handle.retry(window_id, message_id).await? {
        bail!("The last prompt could not be retried");
    }
    Ok(1)
}

/// Id of the newest retryable user message in a window.
fn last_prompt(window: &Window) -> Option<&str> {
    window
        .messages
        .iter()
        .rev()
        .find(|m| m.is_user() && m.is_retryable())
        .map(|m| m.id.as_str())
}

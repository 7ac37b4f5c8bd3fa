use crate::context::AppContext;
use anyhow::{Context, Result, bail};
use paraimage_application::OrchestratorHandle;
use paraimage_core::{Message, SessionRepository};

const URL_PREVIEW_LEN: usize = 60;

/// Starts an orchestrator with every model's history loaded.
async fn hydrated(ctx: &AppContext) -> Result<OrchestratorHandle> {
    let handle = ctx.spawn_orchestrator(None);
    handle
        .refresh_providers()
        .await
        .context("Failed to load providers")?;
    handle.hydrate_history().await?;
    handle.wait_idle().await?;
    Ok(handle)
}

pub async fn list(ctx: &AppContext, model_key: &str) -> Result<()> {
    let handle = hydrated(ctx).await?;
    let known = handle.models().await?.iter().any(|m| m.key == model_key);
    let sessions = if known {
        handle.history(model_key).await?
    } else {
        // Models no longer configured are not hydrated; read the store directly
        ctx.sessions
            .list_by_model(model_key)
            .await
            .context("Failed to read sessions")?
    };
    handle.shutdown();

    if sessions.is_empty() {
        println!("No conversations for {}", model_key);
        return Ok(());
    }
    for session in sessions {
        println!(
            "{}  {}  {} ({} messages)",
            session.id,
            session.updated_at.format("%Y-%m-%d %H:%M"),
            session.title,
            session.messages.len()
        );
    }
    Ok(())
}

pub async fn show(ctx: &AppContext, session_id: &str) -> Result<()> {
    let Some(session) = ctx
        .sessions
        .find_by_id(session_id)
        .await
        .context("Failed to read session")?
    else {
        bail!("No conversation with id '{}'", session_id);
    };

    println!("{} [{}]", session.title, session.model_key);
    for message in &session.messages {
        println!("{}", describe(message));
    }
    Ok(())
}

pub async fn delete(ctx: &AppContext, session_id: &str) -> Result<()> {
    if ctx.sessions.find_by_id(session_id).await?.is_none() {
        bail!("No conversation with id '{}'", session_id);
    }

    let handle = hydrated(ctx).await?;
    ctx.sessions
        .delete(session_id)
        .await
        .context("Failed to delete session")?;
    handle.forget_session(session_id).await?;
    handle.shutdown();

    println!("Deleted conversation {}", session_id);
    Ok(())
}

fn describe(message: &Message) -> String {
    let time = message.timestamp.format("%H:%M:%S");
    if message.is_user() {
        let refs = message.references().len();
        let prompt = message.prompt().unwrap_or_default();
        if refs > 0 {
            format!("{} you: {} (+{} reference image(s))", time, prompt, refs)
        } else {
            format!("{} you: {}", time, prompt)
        }
    } else if let Some(image) = message.image() {
        format!("{} image: {}", time, preview(&image.url))
    } else {
        format!("{} error: {}", time, message.error().unwrap_or_default())
    }
}

fn preview(url: &str) -> String {
    if url.chars().count() <= URL_PREVIEW_LEN {
        url.to_string()
    } else {
        let head: String = url.chars().take(URL_PREVIEW_LEN).collect();
        format!("{}...", head)
    }
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use paraimage_infrastructure::ParaImagePaths;
use std::path::PathBuf;

mod commands;
mod context;
mod logging;
mod output;

use context::AppContext;

#[derive(Parser)]
#[command(name = "paraimage")]
#[command(about = "ParaImage - broadcast one prompt to several image models side by side", long_about = None)]
struct Cli {
    /// Mirror logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage image providers
    Providers {
        #[command(subcommand)]
        action: ProvidersAction,
    },
    /// List the models offered by the configured providers
    Models,
    /// Send one prompt to several models at once
    Generate {
        /// Prompt text
        #[arg(short, long, required_unless_present_any = ["retry", "saved"])]
        prompt: Option<String>,
        /// Use a prompt from the library instead of --prompt
        #[arg(short = 's', long, value_name = "NAME", conflicts_with = "prompt")]
        saved: Option<String>,
        /// Reference image (repeatable)
        #[arg(short = 'r', long = "ref")]
        references: Vec<PathBuf>,
        /// Model key ("Provider::model"), one window per key (repeatable)
        #[arg(short, long = "model", conflicts_with = "continue_session")]
        models: Vec<String>,
        /// Number of windows when no --model is given
        #[arg(short, long, conflicts_with = "continue_session")]
        layout: Option<usize>,
        /// Directory for the generated images
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Append to a stored conversation (see `history list`)
        #[arg(long = "continue", value_name = "SESSION_ID")]
        continue_session: Option<String>,
        /// Re-run the last prompt of the continued conversation
        #[arg(long, requires = "continue_session", conflicts_with_all = ["prompt", "saved", "references"])]
        retry: bool,
    },
    /// Manage the saved prompt library
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },
    /// Browse stored conversations
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum ProvidersAction {
    /// List configured providers
    List,
    /// Add or update a provider
    Add {
        /// Provider name (e.g. "OpenAI", "Google Gemini")
        #[arg(short, long)]
        name: String,
        #[arg(short = 'k', long)]
        api_key: String,
        /// Base URL; leave empty to infer it from the provider name
        #[arg(short, long, default_value = "")]
        base_url: String,
        /// Model id (repeatable)
        #[arg(short, long = "model")]
        models: Vec<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Remove a provider
    Remove { name: String },
}

#[derive(Subcommand)]
enum PromptsAction {
    /// List saved prompts
    List,
    /// Save a prompt under a name, replacing any prompt with that name
    Add { name: String, text: String },
    /// Remove a saved prompt
    Remove { name: String },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List conversations for a model, newest first
    List {
        #[arg(short, long)]
        model: String,
    },
    /// Print one conversation
    Show { id: String },
    /// Delete one conversation
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(&ParaImagePaths::logs_dir()?, cli.verbose)?;

    let ctx = AppContext::load().await?;

    match cli.command {
        Commands::Providers { action } => match action {
            ProvidersAction::List => commands::providers::list(&ctx).await?,
            ProvidersAction::Add {
                name,
                api_key,
                base_url,
                models,
                icon,
            } => commands::providers::add(&ctx, name, api_key, base_url, models, icon).await?,
            ProvidersAction::Remove { name } => commands::providers::remove(&ctx, &name).await?,
        },
        Commands::Models => commands::models::list(&ctx).await?,
        Commands::Generate {
            prompt,
            saved,
            references,
            models,
            layout,
            out,
            continue_session,
            retry,
        } => {
            let prompt = match saved {
                Some(name) => Some(commands::generate::saved_prompt(&ctx, &name)?),
                None => prompt,
            };
            let args = commands::generate::GenerateArgs {
                prompt,
                references,
                models,
                layout,
                out,
                continue_session,
                retry,
            };
            commands::generate::run(&ctx, args).await?
        }
        Commands::Prompts { action } => match action {
            PromptsAction::List => commands::prompts::list(&ctx.prompts)?,
            PromptsAction::Add { name, text } => commands::prompts::add(&ctx.prompts, &name, &text)?,
            PromptsAction::Remove { name } => commands::prompts::remove(&ctx.prompts, &name)?,
        },
        Commands::History { action } => match action {
            HistoryAction::List { model } => commands::history::list(&ctx, &model).await?,
            HistoryAction::Show { id } => commands::history::show(&ctx, &id).await?,
            HistoryAction::Delete { id } => commands::history::delete(&ctx, &id).await?,
        },
    }

    Ok(())
}

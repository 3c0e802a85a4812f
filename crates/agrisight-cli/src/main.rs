//! AgriSight CLI — entry point.
//!
//! # Commands
//!
//! - `agrisight chat [-m MESSAGE] [--image PATH] [-u USER]` — chat (single-shot or REPL)
//! - `agrisight onboard` — write the default config
//! - `agrisight status` — show configuration and backend status
//! - `agrisight tools` — list the tools advertised to the model
//! - `agrisight sessions ...` — inspect and manage stored conversations

mod helpers;
mod onboard;
mod repl;
mod sessions_cmd;
mod status;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use agrisight_agent::{AgentLoop, TurnInput};
use agrisight_core::config::{load_config, Config};
use agrisight_core::session::SessionStore;
use agrisight_core::types::ImagePayload;
use agrisight_core::utils::expand_home;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🌾 AgriSight — AI assistant for Southeast Asian farmers
#[derive(Parser)]
#[command(name = "agrisight", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Attach a photo to the single message (vision backend)
        #[arg(short, long)]
        image: Option<String>,

        /// User identifier; each user has their own conversation
        #[arg(short, long, default_value = "cli:default")]
        user: String,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Write the default configuration
    Onboard,

    /// Show configuration and backend status
    Status,

    /// List the tools advertised to the model
    Tools,

    /// Manage stored conversations
    Sessions {
        #[command(subcommand)]
        action: sessions_cmd::SessionsCommands,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            message,
            image,
            user,
            logs,
        } => {
            init_logging(logs);
            run_chat(message, image, user).await
        }
        Commands::Onboard => onboard::run(),
        Commands::Status => status::run(),
        Commands::Tools => list_tools(),
        Commands::Sessions { action } => sessions_cmd::dispatch(action).await,
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(message: Option<String>, image: Option<String>, user: String) -> Result<()> {
    let config = load_config(None);
    let agent = AgentLoop::from_config(&config)?;
    let store = open_store(&config)?;

    match (message, image) {
        (message, Some(path)) => {
            info!(user = %user, image = %path, "processing image message");
            let image = read_image(&path)?;
            let input = TurnInput::text(message.unwrap_or_default()).with_image(image);
            let reply = agent.process_message(&store, &user, input).await;
            helpers::print_response(&reply);
        }
        (Some(message), None) => {
            info!(user = %user, "processing single message");
            let reply = agent.process_message(&store, &user, TurnInput::text(message)).await;
            helpers::print_response(&reply);
        }
        (None, None) => repl::run(agent, store, &user).await?,
    }

    Ok(())
}

/// Open the session store described by the config.
pub fn open_store(config: &Config) -> Result<SessionStore> {
    SessionStore::from_config(&config.sessions).context("failed to open session store")
}

/// Load an image from disk, guessing its MIME type from the extension.
pub fn read_image(path: &str) -> Result<ImagePayload> {
    let resolved = expand_home(path);
    let bytes = std::fs::read(&resolved)
        .with_context(|| format!("failed to read image: {}", resolved.display()))?;
    anyhow::ensure!(!bytes.is_empty(), "image file is empty: {}", resolved.display());
    Ok(ImagePayload::from_path_bytes(&path_str(&resolved), bytes))
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ─────────────────────────────────────────────
// Tools command
// ─────────────────────────────────────────────

fn list_tools() -> Result<()> {
    let config = load_config(None);
    let registry = agrisight_agent::tools::builtin_registry(&config.tools);

    println!();
    println!("{}", "🌾 AgriSight Tools".green().bold());
    println!();
    for schema in registry.schemas() {
        println!("  {}", schema.name.bold());
        println!("    {}", schema.description.dimmed());
        let params = serde_json::to_string_pretty(&schema.parameters)?;
        for line in params.lines() {
            println!("    {line}");
        }
        println!();
    }
    if config.tools.web_search.api_key.is_empty() {
        println!("  {}", "web_search is disabled (set BRAVE_API_KEY to enable)".dimmed());
        println!();
    }
    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("agrisight=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

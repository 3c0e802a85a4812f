//! `agrisight sessions` — manage stored conversations from the CLI.
//!
//! - `agrisight sessions list` — list stored sessions
//! - `agrisight sessions show <USER>` — print a conversation
//! - `agrisight sessions clear <USER>` — forget messages, keep the profile
//! - `agrisight sessions delete <USER>` — remove the session entirely
//! - `agrisight sessions profile <USER> [--set KEY=VALUE]... [--unset KEY]...`

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use agrisight_core::config::load_config;
use agrisight_core::session::SessionStore;
use agrisight_core::types::Message;
use agrisight_core::utils::truncate_string;

// ─────────────────────────────────────────────
// Subcommand enum
// ─────────────────────────────────────────────

/// Sessions subcommands.
#[derive(Subcommand)]
pub enum SessionsCommands {
    /// List stored sessions, newest first
    List,

    /// Print a user's conversation
    Show {
        /// User identifier
        user: String,
    },

    /// Forget a user's messages (the profile is kept)
    Clear {
        /// User identifier
        user: String,
    },

    /// Delete a user's session entirely
    Delete {
        /// User identifier
        user: String,
    },

    /// Show or edit a user's profile (name, language, region, state_province, country)
    Profile {
        /// User identifier
        user: String,

        /// Set a field, e.g. `--set language=Indonesian`
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Remove a field
        #[arg(long, value_name = "KEY")]
        unset: Vec<String>,
    },
}

// ─────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────

/// Dispatch a sessions subcommand.
pub async fn dispatch(cmd: SessionsCommands) -> Result<()> {
    let config = load_config(None);
    let store = crate::open_store(&config)?;

    match cmd {
        SessionsCommands::List => list_sessions(&store),
        SessionsCommands::Show { user } => show_session(&store, &user).await,
        SessionsCommands::Clear { user } => {
            store
                .clear(&user)
                .await
                .with_context(|| format!("failed to clear session '{user}'"))?;
            println!("  {} cleared messages for {}", "✓".green(), user.bold());
            Ok(())
        }
        SessionsCommands::Delete { user } => {
            if store.delete(&user) {
                println!("  {} deleted session {}", "✓".green(), user.bold());
            } else {
                println!("  {} no session named {}", "·".dimmed(), user.bold());
            }
            Ok(())
        }
        SessionsCommands::Profile { user, set, unset } => edit_profile(&store, &user, &set, &unset).await,
    }
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

fn list_sessions(store: &SessionStore) -> Result<()> {
    let sessions = store.list_sessions();
    println!();
    if sessions.is_empty() {
        println!("  {}", "No stored sessions.".dimmed());
        println!();
        return Ok(());
    }

    println!("  {:<24} {:>8}  {}", "User".bold(), "Messages".bold(), "Updated".bold());
    for s in sessions {
        println!(
            "  {:<24} {:>8}  {}",
            s.key,
            s.message_count,
            s.updated_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
    println!();
    Ok(())
}

async fn show_session(store: &SessionStore, user: &str) -> Result<()> {
    let session = store.acquire(user).await;
    println!();
    if session.messages.is_empty() {
        println!("  {}", "(empty conversation)".dimmed());
    }
    for message in session.messages.iter() {
        println!("  {}", render_line(message));
    }
    println!();
    Ok(())
}

async fn edit_profile(store: &SessionStore, user: &str, set: &[String], unset: &[String]) -> Result<()> {
    let mut session = store.acquire(user).await;

    if !set.is_empty() || !unset.is_empty() {
        for pair in set {
            let (key, value) = parse_assignment(pair)?;
            session.profile.insert(key.to_string(), value.to_string());
        }
        for key in unset {
            session.profile.remove(key.as_str());
        }
        session.touch();
        store
            .save(&session)
            .with_context(|| format!("failed to save profile for '{user}'"))?;
    }

    println!();
    if session.profile.is_empty() {
        println!("  {}", "(no profile fields)".dimmed());
    }
    let mut fields: Vec<_> = session.profile.iter().collect();
    fields.sort();
    for (key, value) in fields {
        println!("  {:<16} {}", key.bold(), value);
    }
    println!();
    Ok(())
}

/// Parse `KEY=VALUE`.
fn parse_assignment(pair: &str) -> Result<(&str, &str)> {
    let (key, value) = pair
        .split_once('=')
        .with_context(|| format!("expected KEY=VALUE, got '{pair}'"))?;
    let key = key.trim();
    anyhow::ensure!(!key.is_empty(), "empty profile key in '{pair}'");
    Ok((key, value.trim()))
}

/// One-line rendering of a stored message.
fn render_line(message: &Message) -> String {
    match message {
        Message::System { content } => format!("{} {}", "system:".dimmed(), truncate_string(content, 80)),
        Message::User { content, .. } => format!("{} {}", "you:".cyan(), content),
        Message::Assistant { content, tool_calls } if !tool_calls.is_empty() => {
            let names: Vec<&str> = tool_calls.iter().map(|c| c.name.as_str()).collect();
            format!(
                "{} {} {}",
                "bot:".green(),
                content.as_deref().unwrap_or_default(),
                format!("[calls {}]", names.join(", ")).dimmed()
            )
        }
        Message::Assistant { content, .. } => {
            format!("{} {}", "bot:".green(), content.as_deref().unwrap_or_default())
        }
        Message::Tool { name, content, .. } => {
            format!("{} {}", format!("{name}:").yellow(), truncate_string(content, 120))
        }
    }
}

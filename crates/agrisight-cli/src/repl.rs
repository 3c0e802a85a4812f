//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! `/image PATH [question]` sends a photo to the vision backend.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use agrisight_agent::{AgentLoop, TurnInput};
use agrisight_core::session::SessionStore;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Run the interactive REPL loop.
pub async fn run(agent: AgentLoop, store: SessionStore, user: &str) -> Result<()> {
    helpers::print_banner(user);

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            // Ctrl-C / Ctrl-D
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_exit_command(trimmed) {
            println!("\nGoodbye! 👋");
            break;
        }

        let _ = editor.add_history_entry(&input);

        let turn = match parse_image_command(trimmed) {
            Some(ImageCommand::Attach { path, question }) => match crate::read_image(path) {
                Ok(image) => TurnInput::text(question).with_image(image),
                Err(e) => {
                    eprintln!("\n❌ {e:#}\n");
                    continue;
                }
            },
            Some(ImageCommand::MissingPath) => {
                eprintln!("\n{IMAGE_USAGE}\n");
                continue;
            }
            None => TurnInput::text(trimmed),
        };

        debug!(user, has_image = turn.image.is_some(), "processing input");
        helpers::print_thinking();
        let reply = agent.process_message(&store, user, turn).await;
        helpers::clear_thinking();
        helpers::print_response(&reply);
    }

    save_history(&mut editor);

    Ok(())
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    agrisight_core::utils::get_data_path().join("history").join("cli_history")
}

fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

const IMAGE_USAGE: &str = "Usage: /image PATH [question]";

/// A parsed `/image` line.
#[derive(Debug, PartialEq, Eq)]
enum ImageCommand<'a> {
    Attach { path: &'a str, question: &'a str },
    MissingPath,
}

/// Parse `/image PATH [question]`. Returns `None` for ordinary chat text.
fn parse_image_command(input: &str) -> Option<ImageCommand<'_>> {
    let rest = input.strip_prefix("/image")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    if rest.is_empty() {
        return Some(ImageCommand::MissingPath);
    }
    let (path, question) = match rest.split_once(char::is_whitespace) {
        Some((path, question)) => (path, question.trim()),
        None => (rest, ""),
    };
    Some(ImageCommand::Attach { path, question })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

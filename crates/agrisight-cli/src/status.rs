//! `agrisight status` — show configuration and backend status.

use anyhow::Result;
use colored::Colorize;

use agrisight_core::config::{get_config_path, load_config};

use crate::helpers::mark;

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "🌾 AgriSight Status".green().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    // Backend
    let backend = &config.backend;
    println!();
    println!("  {}", "Backend:".bold());
    println!("    {:<16} {}", "API base", backend.api_base);
    println!("    {:<16} {}", "API key", mark(backend.is_configured(), "(key set)"));
    println!("    {:<16} {} {}", "Text model", backend.text_model, "(tools)".dimmed());
    println!("    {:<16} {} {}", "Vision model", backend.vision_model, "(images)".dimmed());
    println!("    {:<16} {}s", "Timeout", backend.request_timeout_secs);

    // Agent
    let agent = &config.agent;
    println!();
    println!("  {}", "Agent:".bold());
    println!("    {:<16} {}", "Name", agent.name);
    println!(
        "    {:<16} {}",
        "Directive",
        if agent.directive.is_some() { "custom" } else { "built-in" }
    );
    println!(
        "    {:<16} {}",
        "Parameters",
        format!(
            "temp: {} | max_tokens: {} | max_rounds: {} | history: {}",
            agent.temperature,
            agent.max_tokens.map_or_else(|| "default".to_string(), |n| n.to_string()),
            agent.max_rounds,
            agent.history_limit
        )
        .dimmed()
    );
    println!(
        "    {:<16} {}s per call{}",
        "Tools",
        agent.tool_timeout_secs,
        if agent.parallel_tools { ", concurrent" } else { "" }
    );

    // Sessions
    println!();
    let sessions = if config.sessions.persist {
        config
            .sessions
            .dir
            .clone()
            .unwrap_or_else(|| agrisight_core::utils::get_sessions_path().display().to_string())
    } else {
        "in memory".to_string()
    };
    println!("  {:<18} {}", "Sessions:".bold(), sessions);

    let brave = !config.tools.web_search.api_key.is_empty();
    println!("  {:<18} {}", "Brave Search:".bold(), mark(brave, "(key set)"));

    println!();

    Ok(())
}

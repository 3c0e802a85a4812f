//! `agrisight onboard` — write the default configuration.
//!
//! - Creates `~/.agrisight/config.json` with defaults
//! - Creates the sessions and REPL history directories

use anyhow::{Context, Result};
use colored::Colorize;

use agrisight_core::config::{get_config_path, save_config, Config};
use agrisight_core::utils::{get_data_path, get_sessions_path};

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "🌾 AgriSight — Setup".green().bold());
    println!();

    let config_path = get_config_path();
    if config_path.exists() {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    } else {
        // Defaults only; keys from the environment stay out of the file.
        save_config(&Config::default(), Some(&config_path))
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        println!("  {} created config at {}", "✓".green(), config_path.display());
    }

    let sessions_dir = get_sessions_path();
    std::fs::create_dir_all(&sessions_dir)?;
    println!("  {} sessions at {}", "✓".green(), sessions_dir.display());

    std::fs::create_dir_all(get_data_path().join("history"))?;

    println!();
    println!(
        "{}",
        "  Setup complete! Set NEBIUS_API_KEY (or backend.apiKey), then run `agrisight chat`.".green()
    );
    println!();

    Ok(())
}

//! Config loader — reads `~/.agrisight/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.agrisight/config.json`
//! 3. Environment variables `AGRISIGHT_<SECTION>__<FIELD>` (override JSON)
//! 4. `NEBIUS_API_KEY` / `BRAVE_API_KEY` when no key was set by 2 or 3

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path, &process_env)
}

/// Looks up an environment variable by name.
type EnvLookup = dyn Fn(&str) -> Option<String>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Load config from a specific file path, reading overrides through `env`.
fn load_config_from_path(path: &Path, env: &EnvLookup) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default(), env);
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default(), env);
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default(), env);
        }
    };

    apply_env_overrides(config, env)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `AGRISIGHT_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `AGRISIGHT_AGENT__MAX_ROUNDS` → `agent.max_rounds`
/// - `AGRISIGHT_AGENT__HISTORY_LIMIT` → `agent.history_limit`
/// - `AGRISIGHT_AGENT__TEMPERATURE` → `agent.temperature`
/// - `AGRISIGHT_AGENT__PARALLEL_TOOLS` → `agent.parallel_tools`
/// - `AGRISIGHT_BACKEND__API_KEY` → `backend.api_key`
/// - `AGRISIGHT_BACKEND__API_BASE` → `backend.api_base`
/// - `AGRISIGHT_BACKEND__TEXT_MODEL` → `backend.text_model`
/// - `AGRISIGHT_BACKEND__VISION_MODEL` → `backend.vision_model`
/// - `AGRISIGHT_TOOLS__WEB_SEARCH__API_KEY` → `tools.web_search.api_key`
fn apply_env_overrides(mut config: Config, env: &EnvLookup) -> Config {
    // Agent
    if let Some(n) = env_parse::<usize>(env, "AGRISIGHT_AGENT__MAX_ROUNDS") {
        config.agent.max_rounds = n;
    }
    if let Some(n) = env_parse::<usize>(env, "AGRISIGHT_AGENT__HISTORY_LIMIT") {
        config.agent.history_limit = n;
    }
    if let Some(t) = env_parse::<f64>(env, "AGRISIGHT_AGENT__TEMPERATURE") {
        config.agent.temperature = t;
    }
    if let Some(val) = env("AGRISIGHT_AGENT__PARALLEL_TOOLS") {
        config.agent.parallel_tools = val == "true" || val == "1";
    }

    // Backend
    if let Some(val) = env("AGRISIGHT_BACKEND__API_KEY") {
        config.backend.api_key = val;
    }
    if let Some(val) = env("AGRISIGHT_BACKEND__API_BASE") {
        config.backend.api_base = val;
    }
    if let Some(val) = env("AGRISIGHT_BACKEND__TEXT_MODEL") {
        config.backend.text_model = val;
    }
    if let Some(val) = env("AGRISIGHT_BACKEND__VISION_MODEL") {
        config.backend.vision_model = val;
    }
    if config.backend.api_key.is_empty() {
        if let Some(val) = env("NEBIUS_API_KEY") {
            config.backend.api_key = val;
        }
    }

    // Tools
    if let Some(val) = env("AGRISIGHT_TOOLS__WEB_SEARCH__API_KEY") {
        config.tools.web_search.api_key = val;
    }
    if config.tools.web_search.api_key.is_empty() {
        if let Some(val) = env("BRAVE_API_KEY") {
            config.tools.web_search.api_key = val;
        }
    }

    config
}

/// Read and parse an env var, ignoring values that don't parse.
fn env_parse<T: std::str::FromStr>(env: &EnvLookup, name: &str) -> Option<T> {
    let val = env(name)?;
    match val.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %val, "ignoring unparsable env override");
            None
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

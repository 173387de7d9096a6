//! Configuration loading and credential resolution.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::warn;

use crate::config::schema::Config;

/// Environment variable checked first for the LLM credential.
pub const API_KEY_VAR: &str = "SHOPBOT_API_KEY";

/// Fallback credential variable. The default model and endpoint target
/// Gemini's OpenAI-compatible surface, so the upstream key name is honored.
pub const API_KEY_FALLBACK_VAR: &str = "GEMINI_API_KEY";

/// Get the default configuration file path (`~/.shopbot/config.json`).
pub fn get_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".shopbot").join("config.json")
}

/// Load configuration from a file, or return a default [`Config`] if the file
/// does not exist or cannot be parsed.
///
/// If `config_path` is `None`, the default path (`~/.shopbot/config.json`) is
/// used.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => get_config_path(),
    };

    if path.exists() {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Config>(&contents) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        "Failed to parse config from {}: {}. Using default configuration.",
                        path.display(),
                        e
                    );
                }
            },
            Err(e) => {
                warn!(
                    "Failed to read config from {}: {}. Using default configuration.",
                    path.display(),
                    e
                );
            }
        }
    }

    Config::default()
}

/// Resolve the required LLM API key from the environment.
///
/// Checked in order: [`API_KEY_VAR`], then [`API_KEY_FALLBACK_VAR`]. The
/// process must fail fast at startup when neither is set, so the error names
/// both variables.
pub fn resolve_api_key() -> Result<String> {
    for var in [API_KEY_VAR, API_KEY_FALLBACK_VAR] {
        if let Ok(key) = std::env::var(var) {
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok(key);
            }
        }
    }
    bail!(
        "No LLM API key configured. Set {} (or {}) in the environment \
         before starting shopbot.",
        API_KEY_VAR,
        API_KEY_FALLBACK_VAR
    )
}

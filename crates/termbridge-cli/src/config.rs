//! Client configuration at `~/.termbridge/config.toml`.
//!
//! Shares the server's file: the CLI reads its `[tmux]` section and a
//! `[client]` section with the server address used by `attach`. CLI flags
//! always override config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level config file structure. Unknown sections are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Multiplexer settings.
    #[serde(default)]
    pub tmux: TmuxConfig,

    /// Where `attach` finds the bridge server.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Multiplexer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmuxConfig {
    /// Multiplexer binary.
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Prefix for generated session names; `ls` filters on it.
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,

    /// Agent command typed into new sessions.
    #[serde(default = "default_command")]
    pub default_command: String,
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            session_prefix: default_session_prefix(),
            default_command: default_command(),
        }
    }
}

/// Bridge server address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_binary() -> String {
    "tmux".to_string()
}

fn default_session_prefix() -> String {
    "claude_".to_string()
}

fn default_command() -> String {
    "claude".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Config {
    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

/// Default config location, `~/.termbridge/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".termbridge")
        .join("config.toml")
}

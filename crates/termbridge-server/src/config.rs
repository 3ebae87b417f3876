//! Server configuration: TOML file + CLI overrides.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use termbridge_core::{BridgeError, BridgeResult, DEFAULT_CAPTURE_LINES};

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub tmux: TmuxSection,
}

/// `[server]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

/// `[relay]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySection {
    #[serde(default = "default_capture_lines")]
    pub capture_lines: usize,
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,
    #[serde(default = "default_poll_every")]
    pub poll_every: u32,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            capture_lines: default_capture_lines(),
            recv_timeout_ms: default_recv_timeout_ms(),
            poll_every: default_poll_every(),
        }
    }
}

/// `[tmux]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct TmuxSection {
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,
}

impl Default for TmuxSection {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            session_prefix: default_session_prefix(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_capture_lines() -> usize {
    DEFAULT_CAPTURE_LINES
}
fn default_recv_timeout_ms() -> u64 {
    100
}
fn default_poll_every() -> u32 {
    3
}
fn default_binary() -> String {
    "tmux".to_string()
}
fn default_session_prefix() -> String {
    "claude_".to_string()
}

/// Relay loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Trailing lines captured per snapshot.
    pub capture_lines: usize,
    /// How long one iteration waits for a viewer message.
    pub recv_timeout: Duration,
    /// Pull-mode capture cadence, in iterations.
    pub poll_every: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelaySection::default().into()
    }
}

impl From<RelaySection> for RelayConfig {
    fn from(section: RelaySection) -> Self {
        Self {
            capture_lines: section.capture_lines.max(1),
            recv_timeout: Duration::from_millis(section.recv_timeout_ms.max(1)),
            poll_every: section.poll_every.max(1),
        }
    }
}

/// Resolved server configuration (CLI overrides applied).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub relay: RelayConfig,
    pub tmux_binary: String,
    pub session_prefix: String,
}

/// Values given on the command line; `None` defers to the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub tmux_binary: Option<String>,
}

impl ServerConfig {
    /// Load config from TOML file, then apply CLI overrides.
    pub fn load(config_path: Option<&Path>, cli: CliOverrides) -> BridgeResult<Self> {
        let file_config = match config_path {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };
        Self::resolve(file_config, cli)
    }

    fn resolve(file_config: ConfigFile, cli: CliOverrides) -> BridgeResult<Self> {
        let bind = cli.bind.unwrap_or(file_config.server.bind);
        let port = cli.port.unwrap_or(file_config.server.port);
        let listen_addr: SocketAddr = format!("{bind}:{port}")
            .parse()
            .map_err(|e| BridgeError::Other(format!("invalid listen address {bind}:{port}: {e}")))?;

        Ok(Self {
            listen_addr,
            log_level: cli.log_level.unwrap_or(file_config.server.log_level),
            relay: file_config.relay.into(),
            tmux_binary: cli.tmux_binary.unwrap_or(file_config.tmux.binary),
            session_prefix: file_config.tmux.session_prefix,
        })
    }
}

/// Parse the config file, falling back to defaults when it is absent.
///
/// Runs before logging is initialised, so it reports nothing itself.
pub fn read_config_file(path: &Path) -> BridgeResult<ConfigFile> {
    let expanded = expand_tilde(path);
    if !expanded.exists() {
        return Ok(ConfigFile::default());
    }

    let content = std::fs::read_to_string(&expanded)?;
    toml::from_str::<ConfigFile>(&content)
        .map_err(|e| BridgeError::Other(format!("config parse error: {e}")))
}

/// Expand `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ServerConfig::load(
            Some(&tmp.path().join("missing.toml")),
            CliOverrides::default(),
        )
        .unwrap();

        assert_eq!(cfg.listen_addr, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.relay.capture_lines, 500);
        assert_eq!(cfg.relay.recv_timeout, Duration::from_millis(100));
        assert_eq!(cfg.relay.poll_every, 3);
        assert_eq!(cfg.tmux_binary, "tmux");
        assert_eq!(cfg.session_prefix, "claude_");
    }

    #[test]
    fn file_values_then_cli_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0"
port = 9000

[relay]
poll_every = 5

[tmux]
session_prefix = "agent_"
"#,
        )
        .unwrap();

        let cfg = ServerConfig::load(
            Some(&path),
            CliOverrides {
                port: Some(9100),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(cfg.listen_addr, "0.0.0.0:9100".parse().unwrap());
        assert_eq!(cfg.relay.poll_every, 5);
        assert_eq!(cfg.relay.capture_lines, 500);
        assert_eq!(cfg.session_prefix, "agent_");
    }

    #[test]
    fn zero_cadence_is_clamped() {
        let cfg: RelayConfig = RelaySection {
            capture_lines: 0,
            recv_timeout_ms: 0,
            poll_every: 0,
        }
        .into();
        assert_eq!(cfg.capture_lines, 1);
        assert_eq!(cfg.poll_every, 1);
        assert!(!cfg.recv_timeout.is_zero());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();
        assert!(ServerConfig::load(Some(&path), CliOverrides::default()).is_err());
    }

    #[test]
    fn bad_bind_address_is_an_error() {
        let cli = CliOverrides {
            bind: Some("not an address".into()),
            ..Default::default()
        };
        assert!(ServerConfig::resolve(ConfigFile::default(), cli).is_err());
    }
}

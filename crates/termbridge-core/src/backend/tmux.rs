//! Terminal-multiplexer backed sessions.
//!
//! Drives an external `tmux` binary with name-addressed commands. This
//! backend is pull-only: it has no incremental output channel.

use super::{OutputChannel, SessionBackend, SessionSummary};
use crate::error::{BridgeError, BridgeResult};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info, warn};

/// Result of one multiplexer invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Executes multiplexer commands. Blocking.
pub trait CommandRunner: Send + Sync {
    fn run(&self, args: &[&str]) -> std::io::Result<CommandOutput>;
}

/// Runs the multiplexer as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: String,
}

impl ProcessRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new("tmux")
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, args: &[&str]) -> std::io::Result<CommandOutput> {
        let output = Command::new(&self.binary).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Session backend over a terminal multiplexer.
pub struct MultiplexerBackend<R: CommandRunner = ProcessRunner> {
    runner: R,
}

impl MultiplexerBackend<ProcessRunner> {
    /// Backend driving the given multiplexer binary.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self::new(ProcessRunner::new(binary))
    }
}

impl<R: CommandRunner> MultiplexerBackend<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Multiplexer version string, used to verify it is installed.
    pub fn version(&self) -> BridgeResult<String> {
        self.run(&["-V"]).map(|out| out.trim().to_string())
    }

    /// Run a command, mapping spawn errors and non-zero exits to
    /// `BackendUnavailable`. Returns stdout.
    fn run(&self, args: &[&str]) -> BridgeResult<String> {
        let output = self
            .runner
            .run(args)
            .map_err(|e| BridgeError::BackendUnavailable(format!("{}: {e}", args[0])))?;

        if !output.success {
            return Err(BridgeError::BackendUnavailable(format!(
                "{} failed: {}",
                args[0],
                output.stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

/// Exact-match session target (no prefix matching).
fn session_target(name: &str) -> String {
    format!("={name}")
}

/// Active pane of the exactly-named session.
fn pane_target(name: &str) -> String {
    format!("={name}:")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_workdir(dir: &str) -> PathBuf {
    if dir == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = dir.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(dir)
}

impl<R: CommandRunner> SessionBackend for MultiplexerBackend<R> {
    fn exists(&self, name: &str) -> bool {
        self.run(&["has-session", "-t", &session_target(name)]).is_ok()
    }

    fn create(&self, name: &str, workdir: &str, start_command: &str) -> BridgeResult<()> {
        if self.exists(name) {
            return Err(BridgeError::AlreadyExists(name.to_string()));
        }

        let dir = expand_workdir(workdir);
        std::fs::create_dir_all(&dir)?;
        let dir_str = dir.to_string_lossy();

        // Another creator may take the name between the check above and
        // new-session, which then refuses the duplicate.
        if let Err(e) = self.run(&["new-session", "-d", "-s", name, "-c", &dir_str]) {
            if self.exists(name) {
                return Err(BridgeError::AlreadyExists(name.to_string()));
            }
            return Err(e);
        }
        info!(session = name, workdir = %dir_str, "session created");

        if !start_command.is_empty() {
            if let Err(e) = self.send_command(name, start_command) {
                warn!(session = name, error = %e, "failed to type start command");
            }
        }

        Ok(())
    }

    fn capture(&self, name: &str, max_lines: usize) -> String {
        let start = format!("-{max_lines}");
        match self.run(&["capture-pane", "-t", &pane_target(name), "-p", "-e", "-S", &start]) {
            Ok(text) => text,
            Err(e) => {
                debug!(session = name, error = %e, "capture failed");
                String::new()
            }
        }
    }

    fn send_literal(&self, name: &str, data: &str) -> BridgeResult<()> {
        // `--` keeps a payload such as `-la` from being read as flags.
        self.run(&["send-keys", "-t", &pane_target(name), "-l", "--", data])
            .map(|_| ())
    }

    fn send_named(&self, name: &str, key: &str) -> BridgeResult<()> {
        self.run(&["send-keys", "-t", &pane_target(name), key])
            .map(|_| ())
    }

    fn kill(&self, name: &str) -> bool {
        match self.run(&["kill-session", "-t", &session_target(name)]) {
            Ok(_) => {
                info!(session = name, "session killed");
                true
            }
            Err(_) => false,
        }
    }

    fn resize(&self, name: &str, cols: u16, rows: u16) -> bool {
        if !self.exists(name) {
            return false;
        }
        let (cols, rows) = (cols.to_string(), rows.to_string());
        self.run(&["resize-window", "-t", &pane_target(name), "-x", &cols, "-y", &rows])
            .is_ok()
    }

    fn output_channel(&self, _name: &str) -> Option<OutputChannel> {
        None
    }

    fn list_sessions(&self, prefix: &str) -> Vec<SessionSummary> {
        let Ok(output) = self.run(&["list-sessions", "-F", "#{session_name}:#{session_attached}"])
        else {
            return Vec::new();
        };

        output
            .lines()
            .filter(|line| line.starts_with(prefix))
            .filter_map(|line| {
                let (name, attached) = line.rsplit_once(':').unwrap_or((line, "0"));
                (!name.is_empty()).then(|| SessionSummary {
                    name: name.to_string(),
                    attached: attached != "0",
                })
            })
            .collect()
    }

    fn backend_name(&self) -> &str {
        "tmux"
    }
}

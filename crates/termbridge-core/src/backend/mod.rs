//! Session backend contract.
//!
//! A backend hosts named, long-lived terminal sessions and exposes a small
//! capability set over them. Every operation addresses a session by name and
//! may block for the duration of an external command, so async callers run
//! them on the blocking pool.
//!
//! Backends advertise incremental output by returning a channel from
//! [`SessionBackend::output_channel`]; pull-only backends return `None` and
//! callers poll [`SessionBackend::capture`] instead.

pub mod tmux;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::BridgeResult;
use tokio::sync::mpsc;

pub use tmux::{CommandOutput, CommandRunner, MultiplexerBackend, ProcessRunner};

/// Default trailing window for captures.
pub const DEFAULT_CAPTURE_LINES: usize = 500;

/// Named key used to confirm typed input.
pub const CONFIRM_KEY: &str = "Enter";

/// Incremental output chunks pushed by a backend, in arrival order.
pub type OutputChannel = mpsc::UnboundedReceiver<String>;

/// A live session reported by [`SessionBackend::list_sessions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub name: String,
    /// Whether a native multiplexer client is attached.
    pub attached: bool,
}

/// Capability set the bridge drives sessions through.
pub trait SessionBackend: Send + Sync {
    /// Whether a session with this name is live. Absence is not an error.
    fn exists(&self, name: &str) -> bool;

    /// Start a session in `workdir` and type `start_command` into it.
    ///
    /// Fails with `AlreadyExists` if the name is taken. The start command is
    /// typed and confirmed, so a failing command shows up in the session's
    /// own output rather than here.
    fn create(&self, name: &str, workdir: &str, start_command: &str) -> BridgeResult<()>;

    /// Snapshot of the trailing `max_lines` of the session buffer, styling
    /// codes included. Empty if the session cannot be read.
    fn capture(&self, name: &str, max_lines: usize) -> String;

    /// Inject bytes without key-name interpretation.
    fn send_literal(&self, name: &str, data: &str) -> BridgeResult<()>;

    /// Dispatch a backend-recognised named key (e.g. `Enter`, `C-c`).
    fn send_named(&self, name: &str, key: &str) -> BridgeResult<()>;

    /// Terminate a session. Returns `false` if it did not exist.
    fn kill(&self, name: &str) -> bool;

    /// Resize a session's window. Returns `false` if it does not exist.
    fn resize(&self, name: &str, cols: u16, rows: u16) -> bool;

    /// Incremental output for one subscriber, if the backend can push.
    fn output_channel(&self, name: &str) -> Option<OutputChannel>;

    /// Live sessions whose name starts with `prefix`.
    fn list_sessions(&self, prefix: &str) -> Vec<SessionSummary>;

    /// Type `text` and confirm it.
    fn send_command(&self, name: &str, text: &str) -> BridgeResult<()> {
        self.send_literal(name, text)?;
        self.send_named(name, CONFIRM_KEY)
    }

    /// Short backend name for logs.
    fn backend_name(&self) -> &str;
}

/// Whether `name` is usable as a session name.
///
/// Accepts ASCII letters, digits, `_` and `-`; the multiplexer treats `:`
/// and `.` as target separators.
pub fn is_valid_session_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

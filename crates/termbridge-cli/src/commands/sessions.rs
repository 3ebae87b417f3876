//! `termbridge ls` / `kill` / `capture` / `send` — session management.

use anyhow::{bail, Context, Result};
use termbridge_core::SessionBackend;
use tracing::info;

/// List live sessions carrying `prefix`.
pub fn run_list(backend: &dyn SessionBackend, prefix: &str) -> Result<()> {
    let sessions = backend.list_sessions(prefix);

    println!("{:<28} {}", "SESSION", "ATTACHED");
    println!("{:<28} {}", "───────", "────────");
    if sessions.is_empty() {
        println!("(no sessions)");
    }
    for s in &sessions {
        println!("{:<28} {}", s.name, if s.attached { "yes" } else { "no" });
    }

    Ok(())
}

/// Terminate a session.
pub fn run_kill(backend: &dyn SessionBackend, name: &str) -> Result<()> {
    if !backend.kill(name) {
        bail!("no such session '{name}'");
    }
    info!(session = %name, "killed");
    Ok(())
}

/// Print the trailing `lines` of a session's buffer.
pub fn run_capture(backend: &dyn SessionBackend, name: &str, lines: usize) -> Result<()> {
    if !backend.exists(name) {
        bail!("no such session '{name}'");
    }
    print!("{}", backend.capture(name, lines));
    Ok(())
}

/// Type `text` into a session and confirm it.
pub fn run_send(backend: &dyn SessionBackend, name: &str, text: &str) -> Result<()> {
    if !backend.exists(name) {
        bail!("no such session '{name}'");
    }
    backend
        .send_command(name, text)
        .with_context(|| format!("failed to send to '{name}'"))?;
    Ok(())
}

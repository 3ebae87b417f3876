//! `termbridge new` — start an agent session.
//!
//! Builds the agent start command from flags, picks a session name when none
//! is given, and asks the backend to create the session. The start command is
//! typed into the session, so a failing agent shows its error there.

use anyhow::{bail, Context, Result};
use rand::Rng;
use termbridge_core::{is_valid_session_name, SessionBackend};
use tracing::info;

/// Options for the agent start command.
#[derive(Debug, Clone, Default)]
pub struct StartCommand {
    /// Base command, e.g. `claude`.
    pub base: String,
    /// Resume the previous conversation in this directory.
    pub resume: bool,
    /// Run agent teammates automatically.
    pub teammate: bool,
    /// Skip permission prompts.
    pub skip_permissions: bool,
    /// Mark the environment as a sandbox so permission skipping is allowed
    /// for privileged users.
    pub sandbox: bool,
}

impl StartCommand {
    pub fn build(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if self.skip_permissions && self.sandbox {
            parts.push("IS_SANDBOX=1");
        }
        parts.push(&self.base);
        if self.resume {
            parts.push("--continue");
        }
        if self.teammate {
            parts.extend(["--teammate-mode", "auto"]);
        }
        if self.skip_permissions {
            parts.push("--dangerously-skip-permissions");
        }
        parts.join(" ")
    }
}

/// A fresh session name: `prefix` plus 8 hex characters.
pub fn generate_session_name(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 4] = rng.gen();
    format!("{prefix}{}", hex::encode(bytes))
}

/// Create the session and print its name.
pub fn run(
    backend: &dyn SessionBackend,
    name: Option<&str>,
    prefix: &str,
    workdir: &str,
    start: &StartCommand,
) -> Result<()> {
    let name = match name {
        Some(n) => n.to_string(),
        None => generate_session_name(prefix),
    };
    if !is_valid_session_name(&name) {
        bail!("invalid session name '{name}' (use letters, digits, '_' or '-')");
    }

    let command = start.build();
    info!(session = %name, workdir, command = %command, "creating session");

    backend
        .create(&name, workdir, &command)
        .with_context(|| format!("failed to create session '{name}'"))?;

    println!("{name}");
    Ok(())
}

//! `termbridge key` / `termbridge shortcuts` — shortcut dispatch.

use anyhow::{Context, Result};
use termbridge_core::keys::{dispatch, legacy_shortcuts, KeyAction, KeyDescriptor};
use termbridge_core::SessionBackend;
use tracing::debug;

/// Resolve a descriptor in grammar or legacy-name mode.
pub fn resolve(key: &str, legacy: bool) -> Result<KeyDescriptor> {
    let descriptor = if legacy {
        KeyDescriptor::from_legacy(key)
    } else {
        KeyDescriptor::parse(key)
    };
    descriptor.with_context(|| format!("unrecognised key '{key}'"))
}

/// Send one key to a session.
pub fn run_key(backend: &dyn SessionBackend, name: &str, key: &str, legacy: bool) -> Result<()> {
    let descriptor = resolve(key, legacy)?;
    debug!(session = %name, action = ?descriptor.action(), "dispatching key");
    dispatch(backend, name, &descriptor)
        .with_context(|| format!("failed to send '{key}' to '{name}'"))?;
    Ok(())
}

/// Print the legacy shortcut table.
pub fn run_shortcuts() -> Result<()> {
    println!("{:<12} {:<10} {}", "NAME", "KEY", "SENDS");
    for (name, descriptor) in legacy_shortcuts() {
        let sends = match KeyDescriptor::parse(descriptor)?.action() {
            KeyAction::Named(token) => token,
            KeyAction::Literal(bytes) => format!("{bytes:?}"),
        };
        println!("{name:<12} {descriptor:<10} {sends}");
    }
    Ok(())
}

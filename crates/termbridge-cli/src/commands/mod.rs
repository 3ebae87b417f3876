//! CLI subcommand implementations.

pub mod attach;
pub mod keys;
pub mod new;
pub mod sessions;

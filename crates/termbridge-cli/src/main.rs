//! termbridge — operator CLI for the terminal session bridge.
//!
//! Creates, lists, kills and drives multiplexer-hosted agent sessions, and
//! attaches to them through a running bridge server.

mod commands;
mod config;
mod terminal;

use clap::{Parser, Subcommand};
use commands::new::StartCommand;
use std::path::PathBuf;
use termbridge_core::{MultiplexerBackend, DEFAULT_CAPTURE_LINES};
use tracing::error;

/// termbridge — terminal session bridge client
#[derive(Parser)]
#[command(name = "termbridge", version, about = "Manage and attach to bridged terminal sessions")]
struct Cli {
    /// Config file path
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a new agent session
    New {
        /// Session name (generated from the configured prefix if omitted)
        #[arg(long)]
        name: Option<String>,

        /// Working directory (created if missing)
        #[arg(short = 'C', long, default_value = ".")]
        workdir: String,

        /// Agent command (defaults to the configured command)
        #[arg(long)]
        command: Option<String>,

        /// Resume the previous conversation
        #[arg(long)]
        resume: bool,

        /// Enable automatic teammate mode
        #[arg(long)]
        teammate: bool,

        /// Skip permission prompts
        #[arg(long)]
        skip_permissions: bool,

        /// Mark the environment as a sandbox (with --skip-permissions)
        #[arg(long)]
        sandbox: bool,
    },

    /// List live sessions
    Ls {
        /// List every session, not just those with the configured prefix
        #[arg(short, long)]
        all: bool,
    },

    /// Terminate a session
    Kill {
        /// Session name
        name: String,
    },

    /// Print a session's buffer
    Capture {
        /// Session name
        name: String,

        /// Trailing lines to capture
        #[arg(short = 'n', long, default_value_t = DEFAULT_CAPTURE_LINES)]
        lines: usize,
    },

    /// Type a command into a session and press Enter
    Send {
        /// Session name
        name: String,

        /// Text to type
        text: String,
    },

    /// Send a key or shortcut (e.g. C-c, S-Tab, F5, RAW:\x1b[A)
    Key {
        /// Session name
        name: String,

        /// Key descriptor
        key: String,

        /// Interpret the key as a legacy shortcut name (e.g. ctrl_c)
        #[arg(long)]
        legacy: bool,
    },

    /// List legacy shortcut names
    Shortcuts,

    /// Attach to a session through the bridge server
    Attach {
        /// Session name
        name: String,

        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Server port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing.
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("termbridge=debug,termbridge_cli=debug,termbridge_core=debug")
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("termbridge=warn,termbridge_cli=warn")
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    // Load config file.
    let config_path = cli
        .config
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_path);
    let cfg = match config::Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("termbridge: {e:#}");
            std::process::exit(1);
        }
    };

    let backend = MultiplexerBackend::with_binary(&cfg.tmux.binary);

    let result = match cli.command {
        Command::New {
            name,
            workdir,
            command,
            resume,
            teammate,
            skip_permissions,
            sandbox,
        } => {
            let start = StartCommand {
                base: command.unwrap_or_else(|| cfg.tmux.default_command.clone()),
                resume,
                teammate,
                skip_permissions,
                sandbox,
            };
            commands::new::run(
                &backend,
                name.as_deref(),
                &cfg.tmux.session_prefix,
                &workdir,
                &start,
            )
        }
        Command::Ls { all } => {
            let prefix = if all { "" } else { cfg.tmux.session_prefix.as_str() };
            commands::sessions::run_list(&backend, prefix)
        }
        Command::Kill { name } => commands::sessions::run_kill(&backend, &name),
        Command::Capture { name, lines } => {
            commands::sessions::run_capture(&backend, &name, lines)
        }
        Command::Send { name, text } => commands::sessions::run_send(&backend, &name, &text),
        Command::Key { name, key, legacy } => {
            commands::keys::run_key(&backend, &name, &key, legacy)
        }
        Command::Shortcuts => commands::keys::run_shortcuts(),
        Command::Attach { name, host, port } => {
            let host = host.unwrap_or_else(|| cfg.client.host.clone());
            let port = port.unwrap_or(cfg.client.port);
            commands::attach::run(&name, &host, port).await
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("termbridge: {e:#}");
        std::process::exit(1);
    }
}

//! termbridge-server: terminal session bridge.
//!
//! Accepts WebSocket viewers on `/ws/<session>` and relays each one to a
//! multiplexer-hosted terminal session.

mod config;
mod relay;
mod server;
mod transport;

use clap::Parser;
use config::{CliOverrides, ServerConfig};
use server::BridgeServer;
use std::path::PathBuf;
use std::sync::Arc;
use termbridge_core::MultiplexerBackend;
use tracing::{error, info, warn};

/// termbridge-server — terminal session bridge
#[derive(Parser, Debug)]
#[command(name = "termbridge-server", version, about = "Terminal session bridge")]
struct Cli {
    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen address
    #[arg(long)]
    bind: Option<String>,

    /// Config file path
    #[arg(long, default_value = "~/.termbridge/config.toml")]
    config: String,

    /// Multiplexer binary
    #[arg(long)]
    tmux: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config decides the log level, so it is loaded before tracing starts.
    let config_path = PathBuf::from(&cli.config);
    let loaded = ServerConfig::load(
        Some(&config_path),
        CliOverrides {
            bind: cli.bind.clone(),
            port: cli.port,
            log_level: cli.log_level.clone(),
            tmux_binary: cli.tmux.clone(),
        },
    );

    let log_level = match &loaded {
        Ok(cfg) => cfg.log_level.clone(),
        Err(_) => cli.log_level.clone().unwrap_or_else(|| "info".to_string()),
    };

    // Initialize tracing
    use tracing_subscriber::EnvFilter;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let server_config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config::expand_tilde(&config_path).display(),
        addr = %server_config.listen_addr,
        "starting termbridge-server"
    );

    let backend = MultiplexerBackend::with_binary(&server_config.tmux_binary);
    match backend.version() {
        Ok(version) => info!(version = %version, "multiplexer available"),
        Err(e) => warn!(
            binary = %server_config.tmux_binary,
            error = %e,
            "multiplexer not available; viewers will see no sessions"
        ),
    }

    let bridge = BridgeServer::new(server_config, Arc::new(backend));

    tokio::select! {
        result = bridge.run() => {
            if let Err(e) = result {
                error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        _ = shutdown_signal() => {
            info!("received shutdown signal");
        }
    }

    info!("termbridge-server stopped");
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler, waiting for Ctrl+C only");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}

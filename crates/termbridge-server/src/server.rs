//! Core server: accepts viewer connections and runs one relay per viewer.
//!
//! Owns the session backend and the viewer registry. The backend is built
//! once at startup and shared read-only by every relay task.

use crate::config::ServerConfig;
use crate::relay::{RelayLoop, ViewerRegistry};
use crate::transport::websocket::{self, ViewerConnection};
use std::sync::Arc;
use std::time::Duration;
use termbridge_core::{BridgeResult, SessionBackend};
use tracing::{debug, info, warn};

/// Interval between viewer-count reports.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// The termbridge server instance.
pub struct BridgeServer {
    /// Server configuration.
    config: ServerConfig,
    /// Session backend shared by all relays.
    backend: Arc<dyn SessionBackend>,
    /// Attached viewers.
    registry: ViewerRegistry,
}

impl BridgeServer {
    /// Create a new server instance.
    pub fn new(config: ServerConfig, backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            config,
            backend,
            registry: ViewerRegistry::new(),
        }
    }

    /// Listen for viewers until the listener closes.
    pub async fn run(self) -> BridgeResult<()> {
        let server = Arc::new(self);

        let mut ws_rx = websocket::start_listener(server.config.listen_addr).await?;

        let live = server.backend.list_sessions(&server.config.session_prefix);
        info!(
            addr = %server.config.listen_addr,
            backend = server.backend.backend_name(),
            live_sessions = live.len(),
            "termbridge-server ready"
        );

        tokio::spawn(report_viewers(server.registry.clone()));

        while let Some(conn) = ws_rx.recv().await {
            let srv = server.clone();
            tokio::spawn(async move { srv.handle_viewer(conn).await });
        }

        info!("listener closed, shutting down");
        Ok(())
    }

    async fn handle_viewer(&self, conn: ViewerConnection) {
        let ViewerConnection {
            session,
            remote_addr,
            link,
        } = conn;

        let relay = RelayLoop::new(
            self.backend.clone(),
            self.registry.clone(),
            self.config.relay,
            session.clone(),
            link,
        )
        .with_remote_addr(remote_addr);

        if let Err(e) = relay.run().await {
            warn!(session = %session, remote = %remote_addr, error = %e, "viewer connection error");
        }
        let remaining = self.registry.count(&session).await;
        debug!(
            session = %session,
            remaining,
            "viewer task finished"
        );
    }
}

/// Periodically log how many viewers each session has.
async fn report_viewers(registry: ViewerRegistry) {
    let mut interval = tokio::time::interval(STATS_INTERVAL);
    loop {
        interval.tick().await;

        for (session, viewers) in registry.sessions().await {
            debug!(session = %session, viewers, "viewer stats");
            for entry in registry.list(&session).await {
                let remote = entry
                    .remote_addr
                    .map_or_else(|| "local".to_string(), |a| a.to_string());
                debug!(
                    session = %session,
                    viewer_id = entry.viewer_id,
                    remote = %remote,
                    attached_secs = entry.attached_at.elapsed().as_secs(),
                    "viewer"
                );
            }
        }
    }
}

//! Per-viewer relay loop.
//!
//! One `RelayLoop` runs for each connected viewer. It attaches to a session,
//! sends a full snapshot, then alternates between forwarding viewer input to
//! the backend and pushing output back:
//!
//! - backends with an output channel get every queued chunk drained and sent
//!   as one `append: true` frame per tick;
//! - pull-only backends are re-captured every `poll_every` ticks and a
//!   full-replace frame is sent only when the capture changed.
//!
//! Closing the loop unregisters the viewer and never touches the session.

use super::registry::ViewerRegistry;
use crate::config::RelayConfig;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use termbridge_core::transport::{CLOSE_REASON_NOT_FOUND, CLOSE_SESSION_NOT_FOUND};
use termbridge_core::{
    decode_frame, encode_frame, BridgeError, BridgeMessage, BridgeResult, OutputChannel,
    SessionBackend, ViewerLink, ViewerMessage,
};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// Sent to a viewer whose session is not live.
pub const SESSION_ENDED_NOTICE: &str = "session has ended; restore the task or create a new one";

/// Relay between one viewer and one backend session.
pub struct RelayLoop<L> {
    backend: Arc<dyn SessionBackend>,
    registry: ViewerRegistry,
    config: RelayConfig,
    session: String,
    link: L,
    remote_addr: Option<SocketAddr>,
}

/// Where output comes from once live.
enum OutputSource {
    Push(OutputChannel),
    Pull { cursor: String, polls: u32 },
}

impl<L: ViewerLink> RelayLoop<L> {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        registry: ViewerRegistry,
        config: RelayConfig,
        session: impl Into<String>,
        link: L,
    ) -> Self {
        Self {
            backend,
            registry,
            config,
            session: session.into(),
            link,
            remote_addr: None,
        }
    }

    /// Record the viewer's network address in the registry entry.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Run until the viewer disconnects or a send fails.
    ///
    /// A missing session is not an error: the viewer gets one notice frame
    /// and a close, and `Ok(())` is returned.
    pub async fn run(mut self) -> BridgeResult<()> {
        let session = self.session.clone();

        if !self.blocking(|b, s| b.exists(s)).await? {
            info!(session = %session, "viewer requested a session that is not live");
            self.send(BridgeMessage::snapshot(SESSION_ENDED_NOTICE)).await?;
            self.link
                .close(CLOSE_SESSION_NOT_FOUND, CLOSE_REASON_NOT_FOUND)
                .await?;
            return Ok(());
        }

        let viewer_id = self.registry.register(&session, self.remote_addr).await;
        info!(
            session = %session,
            viewer_id,
            backend = self.backend.backend_name(),
            "viewer attached"
        );

        let result = self.live().await;

        self.registry.unregister(&session, viewer_id).await;
        match &result {
            Ok(()) => info!(session = %session, viewer_id, "viewer detached"),
            Err(e) => info!(session = %session, viewer_id, error = %e, "viewer dropped"),
        }
        result
    }

    async fn live(&mut self) -> BridgeResult<()> {
        let channel = self.blocking(|b, s| b.output_channel(s)).await?;
        let snapshot = self.capture().await?;

        // The first frame is always a full replace, even when empty.
        self.send(BridgeMessage::snapshot(snapshot.clone())).await?;

        let mut source = match channel {
            Some(rx) => OutputSource::Push(rx),
            None => OutputSource::Pull {
                cursor: snapshot,
                polls: 0,
            },
        };

        let mut ticker = tokio::time::interval(self.config.recv_timeout);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                inbound = self.link.recv_text() => match inbound? {
                    Some(text) => self.handle_viewer_message(&text).await?,
                    None => return Ok(()),
                },
                _ = ticker.tick() => {}
            }

            source = self.retrieve_output(source).await?;
        }
    }

    async fn retrieve_output(&mut self, source: OutputSource) -> BridgeResult<OutputSource> {
        match source {
            OutputSource::Push(mut rx) => {
                let (chunk, open) = drain_channel(&mut rx);
                if !chunk.is_empty() {
                    trace!(session = %self.session, bytes = chunk.len(), "sending chunk");
                    self.send(BridgeMessage::chunk(chunk)).await?;
                }
                if open {
                    return Ok(OutputSource::Push(rx));
                }
                debug!(session = %self.session, "output channel closed, polling captures");
                let cursor = self.capture().await?;
                self.send(BridgeMessage::snapshot(cursor.clone())).await?;
                Ok(OutputSource::Pull { cursor, polls: 0 })
            }
            OutputSource::Pull { cursor, polls } => {
                let polls = polls + 1;
                if polls < self.config.poll_every {
                    return Ok(OutputSource::Pull { cursor, polls });
                }

                let current = self.capture().await?;
                if current == cursor {
                    return Ok(OutputSource::Pull { cursor, polls: 0 });
                }

                trace!(session = %self.session, bytes = current.len(), "sending snapshot");
                self.send(BridgeMessage::snapshot(current.clone())).await?;
                Ok(OutputSource::Pull {
                    cursor: current,
                    polls: 0,
                })
            }
        }
    }

    async fn handle_viewer_message(&mut self, text: &str) -> BridgeResult<()> {
        let message: ViewerMessage = match decode_frame(text) {
            Ok(m) => m,
            Err(e) => {
                warn!(session = %self.session, error = %e, "discarding viewer message");
                return Ok(());
            }
        };

        match message {
            ViewerMessage::Input { data } => {
                if data.is_empty() {
                    return Ok(());
                }
                let bytes = data.len();
                match self.blocking(move |b, s| b.send_literal(s, &data)).await? {
                    Ok(()) => trace!(session = %self.session, bytes, "forwarded input"),
                    Err(e) => warn!(session = %self.session, error = %e, "input not delivered"),
                }
            }
            ViewerMessage::Resize { cols, rows } => {
                if !self.blocking(move |b, s| b.resize(s, cols, rows)).await? {
                    debug!(session = %self.session, cols, rows, "resize rejected");
                }
            }
        }
        Ok(())
    }

    fn capture(&self) -> impl Future<Output = BridgeResult<String>> {
        let lines = self.config.capture_lines;
        self.blocking(move |b, s| b.capture(s, lines))
    }

    async fn send(&mut self, message: BridgeMessage) -> BridgeResult<()> {
        let text = encode_frame(&message)?;
        self.link.send_text(text).await
    }

    /// Run a backend call on the blocking pool.
    ///
    /// The returned future owns its handles, so no borrow of the loop is
    /// held while the call runs.
    fn blocking<T, F>(&self, f: F) -> impl Future<Output = BridgeResult<T>>
    where
        F: FnOnce(&dyn SessionBackend, &str) -> T + Send + 'static,
        T: Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let session = self.session.clone();
        async move {
            tokio::task::spawn_blocking(move || f(backend.as_ref(), &session))
                .await
                .map_err(|e| BridgeError::Other(format!("backend task failed: {e}")))
        }
    }
}

/// Take every chunk currently queued, concatenated in arrival order.
///
/// Also reports whether the channel is still open.
pub fn drain_channel(rx: &mut OutputChannel) -> (String, bool) {
    let mut out = String::new();
    loop {
        match rx.try_recv() {
            Ok(chunk) => out.push_str(&chunk),
            Err(TryRecvError::Empty) => return (out, true),
            Err(TryRecvError::Disconnected) => return (out, false),
        }
    }
}

//! WebSocket listener using tokio-tungstenite.
//!
//! Viewers connect to `/ws/<session>`. The session name is taken from the
//! request path during the handshake; any other path is refused with 404
//! before the upgrade completes.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use termbridge_core::{is_valid_session_name, BridgeError, BridgeResult, ViewerLink};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, trace, warn};

/// Path prefix viewers connect under.
pub const VIEWER_PATH_PREFIX: &str = "/ws/";

/// An accepted viewer connection.
pub struct ViewerConnection {
    /// Session named in the request path.
    pub session: String,
    /// Remote address.
    pub remote_addr: SocketAddr,
    /// The upgraded connection.
    pub link: WsLink,
}

/// Session name from a request path, if it is a viewer path.
pub fn session_from_path(path: &str) -> Option<&str> {
    path.strip_prefix(VIEWER_PATH_PREFIX)
        .filter(|name| is_valid_session_name(name))
}

/// Start the WebSocket listener.
///
/// Returns a receiver that yields accepted connections.
pub async fn start_listener(bind_addr: SocketAddr) -> BridgeResult<mpsc::Receiver<ViewerConnection>> {
    let tcp_listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| BridgeError::Transport(format!("WS bind failed: {e}")))?;

    info!(addr = %bind_addr, "WebSocket listener started");

    let (tx, rx) = mpsc::channel::<ViewerConnection>(64);

    tokio::spawn(async move {
        loop {
            match tcp_listener.accept().await {
                Ok((stream, addr)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        match accept_viewer(stream).await {
                            Ok((session, ws)) => {
                                debug!(remote = %addr, session = %session, "WebSocket connection accepted");
                                let conn = ViewerConnection {
                                    session,
                                    remote_addr: addr,
                                    link: WsLink::new(ws),
                                };
                                if tx.send(conn).await.is_err() {
                                    warn!("WebSocket connection channel closed");
                                }
                            }
                            Err(e) => {
                                warn!(remote = %addr, error = %e, "WebSocket handshake failed");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "TCP accept failed");
                }
            }
        }
    });

    Ok(rx)
}

/// Complete the upgrade, extracting the session name from the path.
async fn accept_viewer(stream: TcpStream) -> BridgeResult<(String, WebSocketStream<TcpStream>)> {
    let mut session = None;

    let check_path = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        match session_from_path(request.uri().path()) {
            Some(name) => {
                session = Some(name.to_string());
                Ok(response)
            }
            None => {
                let mut refusal = ErrorResponse::new(Some("unknown path".to_string()));
                *refusal.status_mut() = StatusCode::NOT_FOUND;
                Err(refusal)
            }
        }
    };

    let ws = tokio_tungstenite::accept_hdr_async(stream, check_path)
        .await
        .map_err(|e| BridgeError::Transport(format!("WS upgrade failed: {e}")))?;

    let session =
        session.ok_or_else(|| BridgeError::Transport("upgrade completed without a path".into()))?;
    Ok((session, ws))
}

/// A viewer link over one WebSocket connection.
pub struct WsLink {
    ws: WebSocketStream<TcpStream>,
}

impl WsLink {
    pub fn new(ws: WebSocketStream<TcpStream>) -> Self {
        Self { ws }
    }
}

impl ViewerLink for WsLink {
    async fn recv_text(&mut self) -> BridgeResult<Option<String>> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(other)) => {
                    // Pings are answered by tungstenite itself.
                    trace!(kind = ?message_kind(&other), "ignoring non-text frame");
                }
                Some(Err(e)) => {
                    return Err(BridgeError::Transport(format!("WS recv failed: {e}")));
                }
            }
        }
    }

    async fn send_text(&mut self, text: String) -> BridgeResult<()> {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| BridgeError::Transport(format!("WS send failed: {e}")))
    }

    async fn close(&mut self, code: u16, reason: &str) -> BridgeResult<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.ws
            .close(Some(frame))
            .await
            .map_err(|e| BridgeError::Transport(format!("WS close failed: {e}")))
    }
}

fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}

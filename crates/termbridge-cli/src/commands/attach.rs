//! `termbridge attach <session>` — watch and drive a session through the
//! bridge server.
//!
//! Connects to `ws://host:port/ws/<session>`, enters raw terminal mode, and
//! pipes keystrokes and resize events to the server as viewer messages while
//! drawing output frames. Ctrl+] detaches; the session keeps running.

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use termbridge_core::{
    decode_frame, encode_frame, is_valid_session_name, BridgeMessage, ViewerMessage,
};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::terminal as term;

/// How often the input thread checks whether the session loop has ended.
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Viewer URL for a session.
pub fn viewer_url(host: &str, port: u16, session: &str) -> String {
    format!("ws://{host}:{port}/ws/{session}")
}

/// Attach to `session` on the bridge server at `host:port`.
pub async fn run(session: &str, host: &str, port: u16) -> Result<()> {
    if !is_valid_session_name(session) {
        bail!("invalid session name '{session}'");
    }

    let url = viewer_url(host, port, session);
    info!(url = %url, "connecting");
    let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    let (mut sink, mut stream) = ws.split();

    let (cols, rows) = term::get_terminal_size();
    let resize = encode_frame(&ViewerMessage::Resize { cols, rows })?;
    sink.send(Message::Text(resize.into()))
        .await
        .context("failed to send initial size")?;

    let guard = term::RawModeGuard::enter().context("failed to enter raw terminal mode")?;

    let (tx_input, mut rx_input) = mpsc::channel::<Vec<u8>>(64);
    let (tx_resize, mut rx_resize) = mpsc::channel::<(u16, u16)>(8);
    let (tx_quit, mut rx_quit) = mpsc::channel::<()>(1);

    // crossterm events are read on a blocking thread. It polls so it can
    // notice the receiving side going away and exit.
    let input_handle = tokio::task::spawn_blocking(move || loop {
        if tx_input.is_closed() {
            break;
        }
        match event::poll(INPUT_POLL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!("crossterm poll error: {e}");
                break;
            }
        }
        match event::read() {
            Ok(Event::Key(key_event)) if key_event.kind != KeyEventKind::Release => {
                if term::is_detach_key(&key_event) {
                    let _ = tx_quit.blocking_send(());
                    break;
                }
                if let Some(bytes) = term::key_event_to_bytes(&key_event) {
                    if tx_input.blocking_send(bytes).is_err() {
                        break;
                    }
                }
            }
            Ok(Event::Paste(text)) => {
                if tx_input.blocking_send(text.into_bytes()).is_err() {
                    break;
                }
            }
            Ok(Event::Resize(new_cols, new_rows)) => {
                let _ = tx_resize.blocking_send((new_cols, new_rows));
            }
            Ok(_) => {}
            Err(e) => {
                warn!("crossterm event error: {e}");
                break;
            }
        }
    });

    let mut stdout = std::io::stdout();
    let mut closed_by_server: Option<String> = None;

    let result: Result<()> = async {
        loop {
            tokio::select! {
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match decode_frame::<BridgeMessage>(&text) {
                            Ok(BridgeMessage::Output { data, append }) => {
                                term::render_output(&mut stdout, &data, append)?;
                            }
                            Err(e) => debug!(error = %e, "ignoring unreadable frame"),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        closed_by_server = Some(
                            frame
                                .map(|f| format!("{} ({})", f.reason, u16::from(f.code)))
                                .unwrap_or_else(|| "closed".to_string()),
                        );
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e).context("connection lost"),
                    None => {
                        closed_by_server = Some("connection closed".to_string());
                        break;
                    }
                },
                Some(bytes) = rx_input.recv() => {
                    let data = String::from_utf8_lossy(&bytes).into_owned();
                    let frame = encode_frame(&ViewerMessage::Input { data })?;
                    sink.send(Message::Text(frame.into())).await.context("failed to send input")?;
                }
                Some((c, r)) = rx_resize.recv() => {
                    debug!(cols = c, rows = r, "terminal resized");
                    let frame = encode_frame(&ViewerMessage::Resize { cols: c, rows: r })?;
                    sink.send(Message::Text(frame.into())).await.context("failed to send resize")?;
                }
                _ = rx_quit.recv() => {
                    info!("detach requested");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        Ok(())
    }
    .await;

    drop(rx_input);
    let _ = input_handle.await;
    drop(guard);

    match closed_by_server {
        Some(reason) => eprintln!("\r\nSession '{session}' closed: {reason}"),
        None => eprintln!("\r\nDetached from '{session}'."),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_shape() {
        assert_eq!(
            viewer_url("127.0.0.1", 8000, "claude_1a2b3c4d"),
            "ws://127.0.0.1:8000/ws/claude_1a2b3c4d"
        );
    }

    #[tokio::test]
    async fn rejects_bad_session_name_before_connecting() {
        let err = run("../x", "127.0.0.1", 1).await.unwrap_err();
        assert!(err.to_string().contains("invalid session name"));
    }
}

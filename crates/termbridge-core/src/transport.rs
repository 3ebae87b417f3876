//! Abstract viewer connection.
//!
//! The relay talks to a viewer through this trait so that the websocket
//! server and in-process test links can be swapped freely.

use crate::error::BridgeResult;
use std::future::Future;

/// Close code sent when a viewer asks for a session that is not live.
pub const CLOSE_SESSION_NOT_FOUND: u16 = 4004;

/// Close reason paired with [`CLOSE_SESSION_NOT_FOUND`].
pub const CLOSE_REASON_NOT_FOUND: &str = "session not found";

/// A bidirectional text-message link to one viewer.
///
/// Futures are `Send` so a relay driving the link can be spawned onto the
/// runtime; implementations may still use `async fn`.
pub trait ViewerLink: Send {
    /// Next text message from the viewer. `Ok(None)` once the viewer has
    /// closed the connection. Control frames never surface here.
    ///
    /// Must be cancel-safe: the relay races it against its poll ticker and
    /// drops the future when the ticker wins.
    fn recv_text(&mut self) -> impl Future<Output = BridgeResult<Option<String>>> + Send;

    /// Send one text message.
    fn send_text(&mut self, text: String) -> impl Future<Output = BridgeResult<()>> + Send;

    /// Close the connection with an application close code.
    fn close(&mut self, code: u16, reason: &str) -> impl Future<Output = BridgeResult<()>> + Send;
}

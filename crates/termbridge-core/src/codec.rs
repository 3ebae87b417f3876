//! JSON text framing for the viewer protocol.
//!
//! One protocol message per WebSocket text frame. Frames above
//! [`MAX_FRAME_SIZE`] are rejected before parsing.

use crate::error::{BridgeError, BridgeResult};

/// Largest inbound text frame accepted from a viewer (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1_048_576;

/// Encode a protocol message as a JSON text frame.
pub fn encode_frame<T: serde::Serialize>(value: &T) -> BridgeResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a JSON text frame into a typed protocol message.
pub fn decode_frame<T: serde::de::DeserializeOwned>(text: &str) -> BridgeResult<T> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(BridgeError::InvalidInput(format!(
            "frame too large: {} bytes (max {})",
            text.len(),
            MAX_FRAME_SIZE
        )));
    }
    serde_json::from_str(text).map_err(|e| BridgeError::InvalidInput(e.to_string()))
}

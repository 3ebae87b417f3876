//! termbridge-core: shared library for the terminal session bridge.
//!
//! Provides the session backend contract and its multiplexer implementation,
//! the key-descriptor grammar, viewer wire messages, JSON framing, and the
//! abstract viewer link the relay runs over.

pub mod backend;
pub mod codec;
pub mod error;
pub mod keys;
pub mod messages;
pub mod transport;

// Re-export commonly used items at crate root.
pub use backend::{
    is_valid_session_name, MultiplexerBackend, OutputChannel, SessionBackend, SessionSummary,
    DEFAULT_CAPTURE_LINES,
};
pub use codec::{decode_frame, encode_frame};
pub use error::{BridgeError, BridgeResult};
pub use keys::{dispatch, KeyAction, KeyDescriptor};
pub use messages::{BridgeMessage, ViewerMessage};
pub use transport::ViewerLink;

use thiserror::Error;

/// Errors produced by the terminal session bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid key descriptor: {0:?}")]
    InvalidKey(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Codec(e.to_string())
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

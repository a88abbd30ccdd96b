use thiserror::Error;

/// Errors produced by the clawdash protocol and session layers.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("cannot construct transport: {0}")]
    TransportConstruction(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("not connected")]
    NotConnected,

    #[error("message text is empty")]
    EmptyMessage,

    #[error("no recipient configured")]
    NoRecipient,

    #[error("timeout")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for DashError {
    fn from(e: serde_json::Error) -> Self {
        DashError::Codec(e.to_string())
    }
}

pub type DashResult<T> = Result<T, DashError>;

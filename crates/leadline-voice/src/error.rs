use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("speech engine connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid engine configuration: {0}")]
    Config(String),

    #[error("speech engine connection closed")]
    Closed,

    #[error("malformed engine message: {0}")]
    Protocol(String),
}

/// A telephony frame that could not be decoded.
#[derive(Error, Debug)]
#[error("malformed telephony frame: {0}")]
pub struct FrameError(#[from] pub serde_json::Error);

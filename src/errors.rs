// src/errors.rs

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors surfaced by the chat client.
#[derive(Debug, Error)]
pub enum ChatlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Not connected to the chat server")]
    NotConnected,

    #[error("Logging error: {0}")]
    Logging(String),

    #[error(transparent)]
    WebSocket(#[from] tungstenite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

pub type ChatlineResult<T> = Result<T, ChatlineError>;

impl ChatlineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        ChatlineError::Config(msg.into())
    }

    pub fn transport_error(msg: impl Into<String>) -> Self {
        ChatlineError::Transport(msg.into())
    }

    pub fn protocol_error(msg: impl Into<String>) -> Self {
        ChatlineError::Protocol(msg.into())
    }
}

impl From<flexi_logger::FlexiLoggerError> for ChatlineError {
    fn from(e: flexi_logger::FlexiLoggerError) -> Self {
        ChatlineError::Logging(e.to_string())
    }
}

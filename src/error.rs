use std::time::Duration;
use thiserror::Error;

/// Failures this crate can surface. Nothing here is allowed to take the host
/// process down: terminal transport failures degrade to "no live transcript"
/// while already-reconciled segments stay available.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection not established within {0:?}")]
    ConnectionTimeout(Duration),

    #[error("transport failure: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Malformed server payload. The offending message is dropped and the
    /// stream continues.
    #[error("malformed server payload: {0}")]
    Protocol(String),

    /// Known benign server complaint (e.g. an invalid-unsubscribe-payload
    /// response). Swallowed before it reaches the UI.
    #[error("server rejected request payload: {0}")]
    ServerValidation(String),

    /// Recoverable subscription failure; the caller may retry.
    #[error("subscription failed: {0}")]
    Subscription(String),

    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("a bot has already joined this meeting")]
    BotAlreadyJoined,

    #[error("bot manager returned {status}: {message}")]
    BotService { status: u16, message: String },

    #[error("bot manager request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

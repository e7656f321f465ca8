use thiserror::Error;

use crate::events::DisconnectReason;

/// Library result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running sessions.
#[derive(Error, Debug)]
pub enum Error {
    #[error("connection: {0}")]
    Connection(#[from] ConnectionError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("send: {0}")]
    Send(#[from] SendError),

    #[error("qr: {0}")]
    Qr(String),

    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("not connected")]
    NotConnected,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Connection-related errors.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("no transport attached")]
    NoTransport,

    #[error("closed: {0}")]
    Closed(DisconnectReason),
}

/// Credential store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("save failed: {0}")]
    Save(String),

    #[error("load failed: {0}")]
    Load(String),
}

/// Send message errors.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid recipient: {0:?}")]
    InvalidRecipient(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("session is still starting")]
    SessionStarting,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_errors_keep_their_context() {
        let err: Error = SendError::InvalidRecipient(String::new()).into();
        assert_eq!(err.to_string(), "send: invalid recipient: \"\"");

        let err: Error = ConnectionError::Closed(DisconnectReason::LoggedOut).into();
        assert_eq!(err.to_string(), "connection: closed: logged out (code 401)");
    }
}

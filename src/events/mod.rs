//! Event types emitted by the client.

use crate::store::Credentials;
use crate::types::{Jid, MessageId};
use std::fmt;
use std::time::SystemTime;

/// Events emitted by a [`ProtocolClient`](crate::client::ProtocolClient) to registered handlers.
#[derive(Clone, Debug)]
pub enum Event {
    /// Login QR code for pairing a new device. Re-issued while unscanned.
    Qr { code: String },

    /// Client connected and authenticated.
    Connected,

    /// Connection closed. `reason` decides whether the session may reconnect.
    Disconnected { reason: DisconnectReason },

    /// Incoming message (decrypted).
    Message(MessageEvent),

    /// Credential state changed and should be persisted as-is.
    CredentialsUpdated(Credentials),
}

#[derive(Clone, Debug)]
pub struct MessageEvent {
    /// Chat the message arrived in (remote JID).
    pub from: Jid,
    pub id: MessageId,
    pub timestamp: SystemTime,
    pub is_from_me: bool,
    /// Decoded message content; `None` for protocol/stub messages.
    pub content: Option<MessageContent>,
}

/// The subset of message content the gateway understands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageContent {
    /// Plain text message.
    pub conversation: Option<String>,
    /// Text with link preview, quote or mention metadata.
    pub extended_text: Option<ExtendedText>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendedText {
    pub text: Option<String>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            conversation: Some(text.into()),
            extended_text: None,
        }
    }

    /// Plain-text body: the direct text, else the extended text, else empty.
    pub fn body(&self) -> &str {
        self.conversation
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.extended_text
                    .as_ref()
                    .and_then(|e| e.text.as_deref())
            })
            .unwrap_or("")
    }
}

/// Disconnect reason, carried as a numeric status code.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Forbidden,
    LoggedOut,
    ConnectionLost,
    MultideviceMismatch,
    ConnectionClosed,
    ConnectionReplaced,
    BadSession,
    Unavailable,
    RestartRequired,
    Other(u16),
}

impl DisconnectReason {
    pub fn from_code(code: u16) -> Self {
        match code {
            401 => Self::LoggedOut,
            403 => Self::Forbidden,
            408 => Self::ConnectionLost,
            411 => Self::MultideviceMismatch,
            428 => Self::ConnectionClosed,
            440 => Self::ConnectionReplaced,
            500 => Self::BadSession,
            503 => Self::Unavailable,
            515 => Self::RestartRequired,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::LoggedOut => 401,
            Self::Forbidden => 403,
            Self::ConnectionLost => 408,
            Self::MultideviceMismatch => 411,
            Self::ConnectionClosed => 428,
            Self::ConnectionReplaced => 440,
            Self::BadSession => 500,
            Self::Unavailable => 503,
            Self::RestartRequired => 515,
            Self::Other(code) => *code,
        }
    }

    /// Credentials were revoked; reconnecting with them cannot succeed.
    pub fn is_logged_out(&self) -> bool {
        self.code() == 401
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::LoggedOut => "logged out",
            Self::Forbidden => "forbidden",
            Self::ConnectionLost => "connection lost",
            Self::MultideviceMismatch => "multidevice mismatch",
            Self::ConnectionClosed => "connection closed",
            Self::ConnectionReplaced => "connection replaced by another client",
            Self::BadSession => "bad session",
            Self::Unavailable => "service unavailable",
            Self::RestartRequired => "restart required",
            Self::Other(_) => "disconnected",
        };
        write!(f, "{} (code {})", msg, self.code())
    }
}

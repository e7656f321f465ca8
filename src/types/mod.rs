//! Identifiers shared across sessions.

mod jid;

pub use jid::{Jid, JidParseError, DEFAULT_USER_SERVER};

/// Id of a sent or received message, e.g. `3EB0…`.
pub type MessageId = String;

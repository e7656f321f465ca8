//! Byte channel behind the offline [`Client`](crate::Client).
//!
//! The client only writes: each outgoing text message becomes one encoded
//! frame passed to [`Transport::send`]. Whoever owns the read side reports
//! pairing and disconnects through
//! [`Client::complete_pairing`](crate::Client::complete_pairing) and
//! [`Client::close`](crate::Client::close).

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one encoded frame.
    async fn send(&self, frame: &[u8]) -> Result<()>;

    /// Called once when the client closes with a disconnect reason.
    async fn close(&self) -> Result<()>;
}

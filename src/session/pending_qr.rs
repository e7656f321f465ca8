//! The login QR code waiting to be scanned.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQr {
    /// Session that issued the code.
    pub session_id: String,
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

impl PendingQr {
    /// Time since the code was issued.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.issued_at)
    }
}

/// Holds at most one pending QR code across all sessions: a newer code from
/// any session replaces it, and any session connecting clears it.
#[derive(Debug, Default)]
pub struct PendingQrSlot {
    current: RwLock<Option<PendingQr>>,
}

impl PendingQrSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, session_id: &str, code: String) {
        *self.current.write().await = Some(PendingQr {
            session_id: session_id.to_string(),
            code,
            issued_at: Utc::now(),
        });
    }

    pub async fn clear(&self) {
        *self.current.write().await = None;
    }

    pub async fn current(&self) -> Option<PendingQr> {
        self.current.read().await.clone()
    }
}

//! Session id → live client mapping.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::client::ProtocolClient;

/// Lifecycle state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Reserved; credentials and client are being set up.
    Starting,
    Connecting,
    AwaitingQrScan,
    Connected,
    /// Waiting out the backoff before the next start.
    Reconnecting,
    /// Credentials were revoked. Terminal.
    LoggedOut,
    /// Reconnect budget exhausted. Terminal.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Connecting => "connecting",
            Self::AwaitingQrScan => "awaiting_qr_scan",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::LoggedOut => "logged_out",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Point-in-time copy of a registry entry.
#[derive(Clone)]
pub struct SessionSnapshot {
    pub id: String,
    pub client: Option<Arc<dyn ProtocolClient>>,
    pub auth_dir: PathBuf,
    pub state: SessionState,
    pub reconnect_attempts: u32,
}

impl fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("id", &self.id)
            .field("has_client", &self.client.is_some())
            .field("auth_dir", &self.auth_dir)
            .field("state", &self.state)
            .field("reconnect_attempts", &self.reconnect_attempts)
            .finish()
    }
}

struct Entry {
    seq: u64,
    client: Option<Arc<dyn ProtocolClient>>,
    auth_dir: PathBuf,
    state: SessionState,
    reconnect_attempts: u32,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

impl Inner {
    fn insert(&mut self, id: &str, auth_dir: PathBuf) -> &mut Entry {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.entry(id.to_string()).or_insert(Entry {
            seq,
            client: None,
            auth_dir,
            state: SessionState::Starting,
            reconnect_attempts: 0,
        })
    }
}

/// Registry of sessions. Entries are only ever removed when their start failed.
#[derive(Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<SessionSnapshot> {
        let inner = self.inner.read().await;
        inner.entries.get(id).map(|e| SessionSnapshot {
            id: id.to_string(),
            client: e.client.clone(),
            auth_dir: e.auth_dir.clone(),
            state: e.state,
            reconnect_attempts: e.reconnect_attempts,
        })
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.entries.contains_key(id)
    }

    /// Insert a `Starting` placeholder unless the id exists. Check and insert
    /// happen under one lock, so only one caller wins per id.
    pub async fn reserve(&self, id: &str, auth_dir: PathBuf) -> bool {
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(id) {
            return false;
        }
        inner.insert(id, auth_dir);
        true
    }

    /// Drop an entry that never got a client.
    pub async fn release(&self, id: &str) {
        let mut inner = self.inner.write().await;
        if inner.entries.get(id).is_some_and(|e| e.client.is_none()) {
            inner.entries.remove(id);
        }
    }

    /// Attach a live client, replacing any previous one.
    pub async fn put(&self, id: &str, auth_dir: PathBuf, client: Arc<dyn ProtocolClient>) {
        let mut inner = self.inner.write().await;
        let entry = inner.insert(id, auth_dir);
        entry.client = Some(client);
        entry.state = SessionState::Connecting;
    }

    pub async fn set_state(&self, id: &str, state: SessionState) {
        if let Some(entry) = self.inner.write().await.entries.get_mut(id) {
            entry.state = state;
        }
    }

    /// Count one more reconnect attempt and return the new total.
    pub async fn record_reconnect_attempt(&self, id: &str) -> u32 {
        match self.inner.write().await.entries.get_mut(id) {
            Some(entry) => {
                entry.reconnect_attempts += 1;
                entry.reconnect_attempts
            }
            None => 0,
        }
    }

    pub async fn reset_reconnect_attempts(&self, id: &str) {
        if let Some(entry) = self.inner.write().await.entries.get_mut(id) {
            entry.reconnect_attempts = 0;
        }
    }

    /// Session ids in creation order.
    pub async fn ids(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut ids: Vec<(u64, &String)> =
            inner.entries.iter().map(|(id, e)| (e.seq, id)).collect();
        ids.sort_unstable_by_key(|(seq, _)| *seq);
        ids.into_iter().map(|(_, id)| id.clone()).collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::store::Credentials;

    fn client() -> Arc<dyn ProtocolClient> {
        Arc::new(Client::new(Credentials::init()))
    }

    #[tokio::test]
    async fn reserve_is_exclusive() {
        let registry = SessionRegistry::new();
        assert!(registry.reserve("a", "auth/a".into()).await);
        assert!(!registry.reserve("a", "auth/a".into()).await);
        assert_eq!(registry.len().await, 1);

        let snapshot = registry.get("a").await.unwrap();
        assert_eq!(snapshot.state, SessionState::Starting);
        assert!(snapshot.client.is_none());
    }

    #[tokio::test]
    async fn put_overwrites_client_and_keeps_order() {
        let registry = SessionRegistry::new();
        registry.reserve("first", "auth/first".into()).await;
        registry.put("second", "auth/second".into(), client()).await;
        registry.put("first", "auth/first".into(), client()).await;

        let first = client();
        registry.put("first", "auth/first".into(), Arc::clone(&first)).await;
        let snapshot = registry.get("first").await.unwrap();
        assert!(Arc::ptr_eq(snapshot.client.as_ref().unwrap(), &first));
        assert_eq!(snapshot.state, SessionState::Connecting);

        assert_eq!(registry.ids().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn release_only_drops_placeholders() {
        let registry = SessionRegistry::new();
        registry.reserve("pending", "auth/pending".into()).await;
        registry.put("live", "auth/live".into(), client()).await;

        registry.release("pending").await;
        registry.release("live").await;

        assert!(!registry.contains("pending").await);
        assert!(registry.contains("live").await);
    }

    #[tokio::test]
    async fn reconnect_attempts_count_and_reset() {
        let registry = SessionRegistry::new();
        registry.put("a", "auth/a".into(), client()).await;
        assert_eq!(registry.record_reconnect_attempt("a").await, 1);
        assert_eq!(registry.record_reconnect_attempt("a").await, 2);
        registry.reset_reconnect_attempts("a").await;
        assert_eq!(registry.get("a").await.unwrap().reconnect_attempts, 0);
        assert_eq!(registry.record_reconnect_attempt("missing").await, 0);
    }

    #[tokio::test]
    async fn set_state_ignores_unknown_ids() {
        let registry = SessionRegistry::new();
        registry.set_state("ghost", SessionState::Connected).await;
        assert!(registry.is_empty().await);
    }
}

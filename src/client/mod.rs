//! Protocol client: the seam between the session layer and a WhatsApp connection.
//!
//! [`Client`] is the offline client: it pairs and sends only when driven by
//! its owner through an attached [`Transport`]. Builds with the
//! `whatsapp-web` feature add [`web::WebClient`], a real WhatsApp Web
//! connection.

mod send;
#[cfg(feature = "whatsapp-web")]
pub mod web;

use crate::error::{ConnectionError, Error};
use crate::events::{DisconnectReason, Event};
use crate::store::Credentials;
use crate::transport::Transport;
use crate::types::{Jid, MessageId};
use async_trait::async_trait;
use sha2::Digest;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub use send::SendResponse;

/// Event handler registered on a client. Called for every event, in emission order.
pub type EventHandler = Box<dyn Fn(Event) + Send + Sync>;

/// What the session layer needs from a protocol client.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Register a handler for all future events.
    async fn add_event_handler(&self, handler: EventHandler);

    /// Start connecting. Progress is reported through events.
    async fn connect(&self) -> crate::Result<()>;

    /// Send a plain-text message.
    async fn send_text(&self, to: &Jid, body: &str) -> crate::Result<SendResponse>;

    /// Our JID once paired.
    async fn own_id(&self) -> Option<Jid>;

    /// Tear the connection down without reporting an event. The session is
    /// done with this client afterwards.
    async fn disconnect(&self);
}

/// Builds one client per session from its loaded credentials.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// `auth_dir` exists and holds the session's `creds.json`; clients may
    /// keep further state there.
    async fn create(
        &self,
        session_id: &str,
        auth_dir: &Path,
        creds: Credentials,
    ) -> crate::Result<Arc<dyn ProtocolClient>>;
}

/// Factory for [`Client`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultClientFactory;

#[async_trait]
impl ClientFactory for DefaultClientFactory {
    async fn create(
        &self,
        session_id: &str,
        _auth_dir: &Path,
        creds: Credentials,
    ) -> crate::Result<Arc<dyn ProtocolClient>> {
        debug!(session = session_id, registered = creds.is_registered(), "creating offline client");
        Ok(Arc::new(Client::new(creds)))
    }
}

/// Parameters reported by the server once the QR code has been scanned.
#[derive(Clone, Debug)]
pub struct PairSuccess {
    pub id: Jid,
    pub platform: String,
}

/// Offline client.
///
/// Owns credential state, connection state and event dispatch. Frames leave
/// through the [`Transport`] given to [`with_transport`](Self::with_transport);
/// the owner of the transport's read side reports back via
/// [`complete_pairing`](Self::complete_pairing) and [`close`](Self::close).
/// Without a transport, sending fails.
pub struct Client {
    creds: RwLock<Credentials>,
    handlers: RwLock<Vec<EventHandler>>,
    connected: AtomicBool,
    transport: RwLock<Option<Arc<dyn Transport>>>,
}

impl Client {
    /// Create a new client bound to the given credentials.
    pub fn new(creds: Credentials) -> Self {
        Self {
            creds: RwLock::new(creds),
            handlers: RwLock::new(Vec::new()),
            connected: AtomicBool::new(false),
            transport: RwLock::new(None),
        }
    }

    /// Attach the transport used for sending.
    pub fn with_transport(self, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: RwLock::new(Some(transport)),
            ..self
        }
    }

    /// Add an event handler (called for every event).
    pub async fn add_event_handler<F>(&self, f: F)
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.handlers.write().await.push(Box::new(f));
    }

    /// Connect. Without a paired identity this emits a login QR code;
    /// otherwise the client goes straight to connected.
    pub async fn connect(&self) -> crate::Result<()> {
        let creds = self.creds.read().await.clone();
        if !creds.is_registered() {
            let code = crate::pairing::qr_payload(&crate::pairing::generate_qr_ref(), &creds);
            self.dispatch_event(Event::Qr { code }).await;
            return Ok(());
        }
        self.connected.store(true, Ordering::SeqCst);
        self.dispatch_event(Event::Connected).await;
        Ok(())
    }

    /// Record a successful pairing: update credentials, report them for
    /// persistence, then report the connection as open.
    pub async fn complete_pairing(&self, pair: PairSuccess) -> crate::Result<()> {
        let creds = {
            let mut creds = self.creds.write().await;
            creds.me = Some(pair.id);
            creds.platform = Some(pair.platform);
            creds.clone()
        };
        self.dispatch_event(Event::CredentialsUpdated(creds)).await;
        self.connected.store(true, Ordering::SeqCst);
        self.dispatch_event(Event::Connected).await;
        Ok(())
    }

    /// Close the connection and report why.
    pub async fn close(&self, reason: DisconnectReason) {
        self.shutdown().await;
        self.dispatch_event(Event::Disconnected { reason }).await;
    }

    async fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(transport) = self.transport.write().await.take() {
            if let Err(e) = transport.close().await {
                warn!(error = %e, "closing transport failed");
            }
        }
    }

    /// Whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Get our JID if paired.
    pub async fn get_own_id(&self) -> Option<Jid> {
        self.creds.read().await.me.clone()
    }

    /// Generate a message ID (3EB0 + hex of hash).
    pub fn generate_message_id(&self) -> MessageId {
        use std::time::{SystemTime, UNIX_EPOCH};
        let mut data = Vec::with_capacity(8 + 20 + 16);
        let t = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        data.extend_from_slice(&t.to_be_bytes());
        data.extend_from_slice(b"@c.us");
        data.extend_from_slice(&rand::random::<[u8; 16]>());
        let hash = sha2::Sha256::digest(&data);
        format!("3EB0{}", hex::encode(&hash[..9]))
    }

    async fn dispatch_event(&self, evt: Event) {
        let handlers = self.handlers.read().await;
        for f in handlers.iter() {
            f(evt.clone());
        }
    }

    /// Send a text message over the attached transport.
    pub async fn send_message(&self, to: &Jid, body: &str) -> crate::Result<SendResponse> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let transport = self
            .transport
            .read()
            .await
            .clone()
            .ok_or(Error::Connection(ConnectionError::NoTransport))?;
        let id = self.generate_message_id();
        let frame = send::OutgoingText {
            id: &id,
            to,
            text: body,
        }
        .encode()?;
        transport.send(&frame).await?;
        Ok(SendResponse {
            timestamp: std::time::SystemTime::now(),
            id,
            sender: self.get_own_id().await,
        })
    }
}

#[async_trait]
impl ProtocolClient for Client {
    async fn add_event_handler(&self, handler: EventHandler) {
        self.handlers.write().await.push(handler);
    }

    async fn connect(&self) -> crate::Result<()> {
        Client::connect(self).await
    }

    async fn send_text(&self, to: &Jid, body: &str) -> crate::Result<SendResponse> {
        self.send_message(to, body).await
    }

    async fn own_id(&self) -> Option<Jid> {
        self.get_own_id().await
    }

    async fn disconnect(&self) {
        self.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_USER_SERVER;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        frames: Mutex<Vec<Vec<u8>>>,
        closed: AtomicBool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, data: &[u8]) -> crate::Result<()> {
            self.frames.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn close(&self) -> crate::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn registered_creds() -> Credentials {
        let mut creds = Credentials::init();
        creds.me = Some(Jid::new("111", DEFAULT_USER_SERVER));
        creds
    }

    async fn collect_events(client: &Client) -> Arc<Mutex<Vec<Event>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        client
            .add_event_handler(move |evt| sink.lock().unwrap().push(evt))
            .await;
        seen
    }

    #[test]
    fn generate_message_id_format() {
        let client = Client::new(Credentials::init());
        let id = client.generate_message_id();
        assert!(id.starts_with("3EB0"));
        assert_eq!(id.len(), 4 + 18);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn connect_emits_qr_when_not_paired() {
        let client = Client::new(Credentials::init());
        let seen = collect_events(&client).await;
        client.connect().await.unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        let Event::Qr { code } = &events[0] else {
            panic!("expected qr, got {:?}", events[0]);
        };
        assert!(code.starts_with("2@"));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn connect_emits_connected_when_paired() {
        let client = Client::new(registered_creds());
        let seen = collect_events(&client).await;
        client.connect().await.unwrap();

        assert!(matches!(seen.lock().unwrap()[..], [Event::Connected]));
        assert!(client.is_connected());
        assert_eq!(client.get_own_id().await.unwrap().user, "111");
    }

    #[tokio::test]
    async fn complete_pairing_reports_credentials_then_connected() {
        let client = Client::new(Credentials::init());
        let seen = collect_events(&client).await;
        client
            .complete_pairing(PairSuccess {
                id: Jid::new("222", DEFAULT_USER_SERVER),
                platform: "android".into(),
            })
            .await
            .unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        let Event::CredentialsUpdated(creds) = &events[0] else {
            panic!("expected credentials update, got {:?}", events[0]);
        };
        assert_eq!(creds.me.as_ref().unwrap().user, "222");
        assert_eq!(creds.platform.as_deref(), Some("android"));
        assert!(matches!(events[1], Event::Connected));
    }

    #[tokio::test]
    async fn send_message_fails_when_not_connected() {
        let client = Client::new(Credentials::init());
        let to = Jid::new("123", DEFAULT_USER_SERVER);
        let res = client.send_message(&to, "hello").await;
        assert!(matches!(res.unwrap_err(), Error::NotConnected));
    }

    #[tokio::test]
    async fn send_message_needs_a_transport() {
        let client = Client::new(registered_creds());
        client.connect().await.unwrap();
        let to = Jid::new("123", DEFAULT_USER_SERVER);
        let res = client.send_message(&to, "hello").await;
        assert!(matches!(
            res.unwrap_err(),
            Error::Connection(ConnectionError::NoTransport)
        ));
    }

    #[tokio::test]
    async fn send_message_writes_frame_to_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let client = Client::new(registered_creds()).with_transport(transport.clone());
        client.connect().await.unwrap();

        let to = Jid::new("123", DEFAULT_USER_SERVER);
        let resp = client.send_message(&to, "hello").await.unwrap();
        assert_eq!(resp.sender.unwrap().user, "111");

        let frames = transport.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        let frame: serde_json::Value = serde_json::from_slice(&frames[0]).unwrap();
        assert_eq!(frame["to"], "123@s.whatsapp.net");
        assert_eq!(frame["text"], "hello");
        assert_eq!(frame["id"], resp.id.as_str());
    }

    #[tokio::test]
    async fn close_reports_reason_and_drops_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let client = Client::new(registered_creds()).with_transport(transport.clone());
        client.connect().await.unwrap();
        let seen = collect_events(&client).await;

        client.close(DisconnectReason::ConnectionLost).await;

        assert!(!client.is_connected());
        assert!(transport.closed.load(Ordering::SeqCst));
        assert!(matches!(
            seen.lock().unwrap()[..],
            [Event::Disconnected {
                reason: DisconnectReason::ConnectionLost
            }]
        ));
    }

    #[tokio::test]
    async fn factory_builds_client_from_credentials() {
        let tmp = tempfile::tempdir().unwrap();
        let client = DefaultClientFactory
            .create("alpha", tmp.path(), registered_creds())
            .await
            .unwrap();
        assert_eq!(client.own_id().await.unwrap().user, "111");
    }

    #[tokio::test]
    async fn disconnect_closes_transport_silently() {
        let transport = Arc::new(RecordingTransport::default());
        let client = Client::new(registered_creds()).with_transport(transport.clone());
        client.connect().await.unwrap();
        let seen = collect_events(&client).await;

        ProtocolClient::disconnect(&client).await;

        assert!(!client.is_connected());
        assert!(transport.closed.load(Ordering::SeqCst));
        assert!(seen.lock().unwrap().is_empty());
        let to = Jid::new("123", DEFAULT_USER_SERVER);
        assert!(matches!(
            client.send_message(&to, "hello").await.unwrap_err(),
            Error::NotConnected
        ));
    }
}

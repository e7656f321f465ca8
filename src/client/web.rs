//! WhatsApp Web client backed by `wa-rs`.
//!
//! Device keys and Signal sessions live in `<auth_dir>/whatsapp.db`, owned by
//! wa-rs. `creds.json` keeps the paired account, updated on pair success.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wa_rs::bot::Bot;
use wa_rs::store::SqliteStore;
use wa_rs_core::types::events::Event as WaEvent;
use wa_rs_tokio_transport::TokioWebSocketTransportFactory;
use wa_rs_ureq_http::UreqHttpClient;

use super::{ClientFactory, EventHandler, ProtocolClient, SendResponse};
use crate::error::{ConnectionError, Error, SendError};
use crate::events::{DisconnectReason, Event, ExtendedText, MessageContent, MessageEvent};
use crate::store::Credentials;
use crate::types::Jid;

/// wa-rs device database, inside the session's auth directory.
pub const DEVICE_DB: &str = "whatsapp.db";

/// Factory for [`WebClient`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WebClientFactory;

#[async_trait]
impl ClientFactory for WebClientFactory {
    async fn create(
        &self,
        session_id: &str,
        auth_dir: &Path,
        creds: Credentials,
    ) -> crate::Result<Arc<dyn ProtocolClient>> {
        debug!(session = session_id, registered = creds.is_registered(), "creating web client");
        Ok(Arc::new(WebClient::new(session_id, auth_dir.join(DEVICE_DB), creds)))
    }
}

/// State reachable from the wa-rs event callback.
struct Shared {
    session_id: String,
    creds: RwLock<Credentials>,
    handlers: RwLock<Vec<EventHandler>>,
    connected: AtomicBool,
}

impl Shared {
    async fn dispatch(&self, evt: Event) {
        for handler in self.handlers.read().await.iter() {
            handler(evt.clone());
        }
    }

    async fn disconnected(&self, reason: DisconnectReason) {
        self.connected.store(false, Ordering::SeqCst);
        self.dispatch(Event::Disconnected { reason }).await;
    }

    async fn on_wa_event(&self, event: WaEvent) {
        match event {
            WaEvent::PairingQrCode { code, .. } => self.dispatch(Event::Qr { code }).await,
            WaEvent::PairSuccess(pair) => {
                let creds = {
                    let mut creds = self.creds.write().await;
                    match pair.id.to_string().parse::<Jid>() {
                        Ok(me) => creds.me = Some(me.to_non_device()),
                        Err(e) => {
                            warn!(session = %self.session_id, error = %e, "paired JID unreadable")
                        }
                    }
                    creds.platform = Some(pair.platform.clone());
                    creds.clone()
                };
                info!(session = %self.session_id, "pairing succeeded");
                self.dispatch(Event::CredentialsUpdated(creds)).await;
            }
            WaEvent::Connected(_) => {
                self.connected.store(true, Ordering::SeqCst);
                self.dispatch(Event::Connected).await;
            }
            WaEvent::LoggedOut(_) => self.disconnected(DisconnectReason::LoggedOut).await,
            WaEvent::Disconnected(_) => self.disconnected(DisconnectReason::ConnectionClosed).await,
            WaEvent::StreamError(err) => {
                warn!(session = %self.session_id, error = ?err, "stream error");
                self.disconnected(DisconnectReason::ConnectionLost).await;
            }
            WaEvent::Message(msg, info) => {
                let Some(from) = reply_target(&info.source.chat.to_string()) else {
                    warn!(
                        session = %self.session_id,
                        chat = %info.source.chat,
                        "unreadable chat JID"
                    );
                    return;
                };
                let extended = msg
                    .extended_text_message
                    .as_ref()
                    .and_then(|ext| ext.text.as_deref());
                self.dispatch(Event::Message(MessageEvent {
                    from,
                    id: info.id.clone(),
                    timestamp: SystemTime::from(info.timestamp),
                    is_from_me: info.source.is_from_me,
                    content: message_content(msg.conversation.as_deref(), extended),
                }))
                .await;
            }
            _ => {}
        }
    }
}

/// Chat a reply goes to: the chat JID without its device part.
fn reply_target(chat: &str) -> Option<Jid> {
    chat.parse::<Jid>().ok().map(|jid| jid.to_non_device())
}

/// `None` when the message carries neither plain nor extended text.
fn message_content(conversation: Option<&str>, extended: Option<&str>) -> Option<MessageContent> {
    if conversation.is_none() && extended.is_none() {
        return None;
    }
    Some(MessageContent {
        conversation: conversation.map(str::to_string),
        extended_text: extended.map(|text| ExtendedText {
            text: Some(text.to_string()),
        }),
    })
}

fn transport_error(e: impl std::fmt::Display) -> Error {
    ConnectionError::Transport(e.to_string()).into()
}

/// One WhatsApp Web connection, run by a wa-rs bot.
pub struct WebClient {
    db_path: PathBuf,
    shared: Arc<Shared>,
    client: RwLock<Option<Arc<wa_rs::Client>>>,
    bot: Mutex<Option<JoinHandle<()>>>,
}

impl WebClient {
    pub fn new(session_id: &str, db_path: PathBuf, creds: Credentials) -> Self {
        Self {
            db_path,
            shared: Arc::new(Shared {
                session_id: session_id.to_string(),
                creds: RwLock::new(creds),
                handlers: RwLock::new(Vec::new()),
                connected: AtomicBool::new(false),
            }),
            client: RwLock::new(None),
            bot: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolClient for WebClient {
    async fn add_event_handler(&self, handler: EventHandler) {
        self.shared.handlers.write().await.push(handler);
    }

    async fn connect(&self) -> crate::Result<()> {
        let backend = Arc::new(
            SqliteStore::new(&self.db_path.to_string_lossy())
                .await
                .map_err(transport_error)?,
        );
        let shared = Arc::clone(&self.shared);
        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .on_event(move |event, _client| {
                let shared = Arc::clone(&shared);
                async move { shared.on_wa_event(event).await }
            })
            .build()
            .await
            .map_err(transport_error)?;

        *self.client.write().await = Some(bot.client());
        let handle = bot.run().await.map_err(transport_error)?;
        *self.bot.lock().await = Some(handle);
        debug!(session = %self.shared.session_id, db = %self.db_path.display(), "bot running");
        Ok(())
    }

    async fn send_text(&self, to: &Jid, body: &str) -> crate::Result<SendResponse> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let client = self.client.read().await.clone().ok_or(Error::NotConnected)?;
        let recipient = to
            .to_string()
            .parse::<wa_rs_binary::jid::Jid>()
            .map_err(|_| SendError::InvalidRecipient(to.to_string()))?;
        let message = wa_rs_proto::whatsapp::Message {
            conversation: Some(body.to_string()),
            ..Default::default()
        };
        let id = client
            .send_message(recipient, message)
            .await
            .map_err(transport_error)?;
        Ok(SendResponse {
            timestamp: SystemTime::now(),
            id,
            sender: self.own_id().await,
        })
    }

    async fn own_id(&self) -> Option<Jid> {
        self.shared.creds.read().await.me.clone()
    }

    async fn disconnect(&self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        if let Some(client) = self.client.write().await.take() {
            client.disconnect().await;
        }
        if let Some(handle) = self.bot.lock().await.take() {
            handle.abort();
        }
    }
}

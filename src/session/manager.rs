//! Session lifecycle: start clients, react to their events, reconnect.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::message_log::MessageLog;
use super::pending_qr::{PendingQr, PendingQrSlot};
use super::reconnect::ReconnectConfig;
use super::registry::{SessionRegistry, SessionSnapshot, SessionState};
use crate::client::{ClientFactory, ProtocolClient, SendResponse};
use crate::config::SessionsConfig;
use crate::error::{Error, SendError};
use crate::events::{DisconnectReason, Event, MessageEvent};
use crate::store::{load_or_init, CredentialStore, FileStore};
use crate::types::Jid;

/// Result of [`SessionManager::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Whether a session's event task keeps reading after an event.
enum Flow {
    Continue,
    Stop,
}

struct Inner {
    sessions: SessionsConfig,
    reconnect: ReconnectConfig,
    registry: SessionRegistry,
    pending_qr: PendingQrSlot,
    message_log: MessageLog,
    factory: Arc<dyn ClientFactory>,
}

/// Owns every session of the process. Cheap to clone.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        sessions: SessionsConfig,
        reconnect: ReconnectConfig,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        let message_log = MessageLog::new(sessions.log_dir.clone());
        Self {
            inner: Arc::new(Inner {
                sessions,
                reconnect,
                registry: SessionRegistry::new(),
                pending_qr: PendingQrSlot::new(),
                message_log,
                factory,
            }),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// Credential directory of a session.
    pub fn auth_dir(&self, session_id: &str) -> PathBuf {
        self.inner.sessions.auth_dir.join(session_id)
    }

    pub async fn session(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.inner.registry.get(session_id).await
    }

    pub async fn session_ids(&self) -> Vec<String> {
        self.inner.registry.ids().await
    }

    pub async fn pending_qr(&self) -> Option<PendingQr> {
        self.inner.pending_qr.current().await
    }

    /// Start a session unless one with this id already exists. Returns once the
    /// client is registered; connecting continues in the background.
    pub async fn start(&self, session_id: &str) -> crate::Result<StartOutcome> {
        let reserved = self
            .inner
            .registry
            .reserve(session_id, self.auth_dir(session_id))
            .await;
        if !reserved {
            debug!(session = session_id, "session already running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        if let Err(e) = self.launch(session_id).await {
            self.inner.registry.release(session_id).await;
            return Err(e);
        }
        info!(session = session_id, "session started");
        Ok(StartOutcome::Started)
    }

    /// Send a plain-text message through a session.
    pub async fn send_text(
        &self,
        session_id: &str,
        to: &str,
        body: &str,
    ) -> crate::Result<SendResponse> {
        let session = self
            .inner
            .registry
            .get(session_id)
            .await
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let client = session.client.ok_or(SendError::SessionStarting)?;
        let jid =
            Jid::from_recipient(to).map_err(|_| SendError::InvalidRecipient(to.to_string()))?;
        client.send_text(&jid, body).await
    }

    /// Open the credential store, build a client, register it and spawn its
    /// event task. Used for the first start and for every reconnect.
    fn launch<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, crate::Result<()>> {
        async move {
            let auth_dir = self.auth_dir(session_id);
            let store = FileStore::open(&auth_dir).await?;
            let creds = load_or_init(&store).await?;
            let client = self
                .inner
                .factory
                .create(session_id, &auth_dir, creds)
                .await?;

            let (tx, rx) = mpsc::unbounded_channel();
            client
                .add_event_handler(Box::new(move |evt| {
                    // Receiver gone means the event task has stopped for good.
                    let _ = tx.send(evt);
                }))
                .await;
            self.inner
                .registry
                .put(session_id, auth_dir, Arc::clone(&client))
                .await;

            tokio::spawn(
                self.clone()
                    .drive(session_id.to_string(), client, store, rx),
            );
            Ok(())
        }
        .boxed()
    }

    /// Connect, then handle the client's events one at a time, in order.
    async fn drive(
        self,
        session_id: String,
        client: Arc<dyn ProtocolClient>,
        store: FileStore,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        if let Err(e) = client.connect().await {
            warn!(session = %session_id, error = %e, "connect failed");
            client.disconnect().await;
            self.reconnect(&session_id).await;
            return;
        }
        while let Some(event) = events.recv().await {
            let flow = self.handle_event(&session_id, &client, &store, event).await;
            if let Flow::Stop = flow {
                break;
            }
        }
        debug!(session = %session_id, "event task finished");
    }

    async fn handle_event(
        &self,
        session_id: &str,
        client: &Arc<dyn ProtocolClient>,
        store: &dyn CredentialStore,
        event: Event,
    ) -> Flow {
        match event {
            Event::Qr { code } => {
                info!(
                    session = session_id,
                    code = %code,
                    "QR code received, scan it with WhatsApp"
                );
                if self.inner.sessions.print_qr_in_terminal {
                    match crate::qr::render_terminal(&code) {
                        Ok(art) => info!(session = session_id, "\n{art}"),
                        Err(e) => warn!(session = session_id, error = %e, "cannot draw QR code"),
                    }
                }
                self.inner.pending_qr.set(session_id, code).await;
                self.inner
                    .registry
                    .set_state(session_id, SessionState::AwaitingQrScan)
                    .await;
            }
            Event::Connected => {
                info!(session = session_id, "WhatsApp connection established");
                self.inner.pending_qr.clear().await;
                self.inner
                    .registry
                    .set_state(session_id, SessionState::Connected)
                    .await;
                self.inner.registry.reset_reconnect_attempts(session_id).await;
            }
            Event::Disconnected { reason } => {
                client.disconnect().await;
                self.handle_disconnect(session_id, reason).await;
                return Flow::Stop;
            }
            Event::Message(message) => self.handle_message(session_id, client, message).await,
            Event::CredentialsUpdated(creds) => {
                if let Err(e) = store.save(&creds).await {
                    error!(session = session_id, error = %e, "saving credentials failed");
                }
            }
        }
        Flow::Continue
    }

    async fn handle_message(
        &self,
        session_id: &str,
        client: &Arc<dyn ProtocolClient>,
        message: MessageEvent,
    ) {
        if message.is_from_me {
            return;
        }
        let Some(content) = message.content.as_ref() else {
            return;
        };
        let body = content.body();
        let from = message.from.to_string();
        info!(session = session_id, from = %from, body, "message received");

        let reply = self.inner.sessions.reply_for(session_id);
        if let Err(e) = client.send_text(&message.from, &reply).await {
            warn!(session = session_id, to = %from, error = %e, "auto-reply failed");
        }

        if let Err(e) = self
            .inner
            .message_log
            .append(session_id, Utc::now(), &from, body)
            .await
        {
            error!(session = session_id, error = %e, "writing message log failed");
        }
    }

    async fn handle_disconnect(&self, session_id: &str, reason: DisconnectReason) {
        if reason.is_logged_out() {
            self.inner
                .registry
                .set_state(session_id, SessionState::LoggedOut)
                .await;
            warn!(
                session = session_id,
                auth_dir = %self.auth_dir(session_id).display(),
                "logged out; delete the auth directory and restart to pair again"
            );
            return;
        }
        info!(session = session_id, %reason, "connection closed, reconnecting");
        self.reconnect(session_id).await;
    }

    /// Wait out the backoff and start the session again, until a start
    /// succeeds or the attempt budget runs out.
    async fn reconnect(&self, session_id: &str) {
        loop {
            let attempt = self
                .inner
                .registry
                .record_reconnect_attempt(session_id)
                .await;
            let Some(delay) = self.inner.reconnect.delay_for(attempt) else {
                self.inner
                    .registry
                    .set_state(session_id, SessionState::Failed)
                    .await;
                error!(
                    session = session_id,
                    attempts = attempt.saturating_sub(1),
                    "reconnect attempts exhausted, giving up"
                );
                return;
            };
            self.inner
                .registry
                .set_state(session_id, SessionState::Reconnecting)
                .await;
            info!(
                session = session_id,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "scheduling reconnect"
            );
            tokio::time::sleep(delay).await;

            match self.launch(session_id).await {
                Ok(()) => return,
                Err(e) => error!(session = session_id, attempt, error = %e, "restart failed"),
            }
        }
    }
}

//! # whatsapp-sessions
//!
//! Runs several independent WhatsApp sessions in one process and exposes
//! them over a small HTTP API.
//!
//! ## Features
//!
//! - Start sessions on demand; each keeps its credentials in its own directory
//! - QR code login, served as a PNG data URL and optionally printed to the terminal
//! - Automatic reply to incoming text messages, with a per-session message log
//! - Bounded automatic reconnect; a logged-out session stays down
//! - Send text messages through any running session
//! - Real WhatsApp Web connections through wa-rs, with the `whatsapp-web` feature
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use whatsapp_sessions::{client::DefaultClientFactory, config::AppConfig, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let manager = SessionManager::new(
//!         config.sessions,
//!         config.reconnect,
//!         Arc::new(DefaultClientFactory),
//!     );
//!     manager.start("session1").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod logging;
pub mod pairing;
pub mod qr;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use client::{Client, ClientFactory, DefaultClientFactory, ProtocolClient, SendResponse};
pub use error::{Error, Result};
pub use events::{DisconnectReason, Event, MessageEvent};
pub use session::{SessionManager, SessionState, StartOutcome};
pub use store::{CredentialStore, Credentials, FileStore};
pub use transport::Transport;
pub use types::{Jid, MessageId};

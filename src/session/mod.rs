//! Sessions: one protocol client per session id, its lifecycle and bookkeeping.

mod manager;
mod message_log;
mod pending_qr;
mod reconnect;
mod registry;

pub use manager::{SessionManager, StartOutcome};
pub use message_log::MessageLog;
pub use pending_qr::{PendingQr, PendingQrSlot};
pub use reconnect::ReconnectConfig;
pub use registry::{SessionRegistry, SessionSnapshot, SessionState};

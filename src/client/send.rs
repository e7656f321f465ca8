//! Send message types.

use crate::error::SendError;
use crate::types::{Jid, MessageId};
use serde::Serialize;
use std::time::SystemTime;

/// Response from sending a message.
#[derive(Clone, Debug)]
pub struct SendResponse {
    pub timestamp: SystemTime,
    pub id: MessageId,
    pub sender: Option<Jid>,
}

/// Text message as handed to the transport.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct OutgoingText<'a> {
    pub id: &'a str,
    pub to: &'a Jid,
    pub text: &'a str,
}

impl OutgoingText<'_> {
    pub(crate) fn encode(&self) -> Result<Vec<u8>, SendError> {
        serde_json::to_vec(self).map_err(|e| SendError::Encode(e.to_string()))
    }
}

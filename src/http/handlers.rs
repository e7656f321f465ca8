//! Request handlers.
//!
//! Every route is a `GET`. Success and error bodies are plain text, except
//! `/qr`, `/sessions` and `/sessions/{id}` which answer JSON.

use axum::{
    extract::{Path, Query, State},
    response::Html,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::error::ApiError;
use super::state::AppState;
use crate::session::{SessionState, StartOutcome};
use crate::Error;

/// Query parameters for `/send/{id}`. Missing values are sent as empty strings.
#[derive(Debug, Default, Deserialize)]
pub struct SendQuery {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub message: String,
}

/// Body of `/qr`.
#[derive(Debug, Serialize)]
pub struct QrResponse {
    #[serde(rename = "qrDataURL")]
    pub qr_data_url: String,
}

/// Body of `/sessions/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub id: String,
    pub state: SessionState,
    pub reconnect_attempts: u32,
}

/// Start a session unless it is already registered.
#[instrument(skip(state))]
pub async fn add_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    match state.sessions.start(&id).await {
        Ok(StartOutcome::Started) => Ok(format!("Session {id} started.")),
        Ok(StartOutcome::AlreadyRunning) => Ok(format!("Session {id} is already running.")),
        Err(e) => {
            error!(session = %id, error = %e, "starting session failed");
            Err(ApiError::Internal(format!("Failed to start session {id}.")))
        }
    }
}

/// Send a text message through a session.
#[instrument(skip(state, query))]
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SendQuery>,
) -> Result<String, ApiError> {
    match state.sessions.send_text(&id, &query.to, &query.message).await {
        Ok(_) => Ok(format!("Message sent to {} via session {id}.", query.to)),
        Err(Error::SessionNotFound(_)) => {
            Err(ApiError::NotFound(format!("Session {id} not found.")))
        }
        Err(e) => {
            error!(session = %id, error = %e, "sending message failed");
            Err(ApiError::Internal(format!("Failed to send message via session {id}.")))
        }
    }
}

/// The most recent login QR code as a PNG data URL.
pub async fn qr_code(State(state): State<AppState>) -> Result<Json<QrResponse>, ApiError> {
    let Some(pending) = state.sessions.pending_qr().await else {
        return Err(ApiError::NotFound("No QR code available".into()));
    };
    debug!(
        session = %pending.session_id,
        age_ms = pending.age(Utc::now()).num_milliseconds(),
        "serving QR code"
    );
    let qr_data_url = crate::qr::render_data_url(&pending.code).map_err(|e| {
        error!(session = %pending.session_id, error = %e, "rendering QR code failed");
        ApiError::Internal("Failed to render QR code".into())
    })?;
    Ok(Json(QrResponse { qr_data_url }))
}

/// All session ids, in creation order.
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.sessions.session_ids().await)
}

pub async fn session_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatus>, ApiError> {
    let session = state
        .sessions
        .session(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session {id} not found.")))?;
    Ok(Json(SessionStatus {
        id: session.id,
        state: session.state,
        reconnect_attempts: session.reconnect_attempts,
    }))
}

/// Landing page.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    tokio::fs::read_to_string(state.index_file.as_path())
        .await
        .map(Html)
        .map_err(|e| {
            warn!(path = %state.index_file.display(), error = %e, "landing page unavailable");
            ApiError::NotFound("Not found".into())
        })
}

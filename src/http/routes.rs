//! Route definitions

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/add-session/{id}", get(handlers::add_session))
        .route("/send/{id}", get(handlers::send_message))
        .route("/qr", get(handlers::qr_code))
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/{id}", get(handlers::session_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

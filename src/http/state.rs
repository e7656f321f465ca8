//! Application state shared across handlers

use std::path::PathBuf;
use std::sync::Arc;

use crate::session::SessionManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// All sessions of the process
    pub sessions: SessionManager,
    /// Landing page served at `/`
    pub index_file: Arc<PathBuf>,
}

impl AppState {
    pub fn new(sessions: SessionManager, index_file: impl Into<PathBuf>) -> Self {
        Self {
            sessions,
            index_file: Arc::new(index_file.into()),
        }
    }
}

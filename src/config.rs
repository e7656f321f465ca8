//! Application configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `config.toml` (or the file named by `WA_SESSIONS_CONFIG`), then
//! `WA_SESSIONS_*` environment variables with `__` between sections,
//! e.g. `WA_SESSIONS_SERVER__PORT=9000`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::session::ReconnectConfig;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "WA_SESSIONS";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from file and environment on top of the defaults.
    pub fn load() -> crate::Result<Self> {
        let file = std::env::var(format!("{ENV_PREFIX}_CONFIG"))
            .unwrap_or_else(|_| "config".to_string());
        let config = config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Landing page served at `/`
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

fn default_index_file() -> PathBuf {
    PathBuf::from("index.html")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            index_file: default_index_file(),
        }
    }
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Session started unconditionally at boot
    #[serde(default = "default_session")]
    pub default_session: String,

    /// Parent of the per-session credential directories
    #[serde(default = "default_auth_dir")]
    pub auth_dir: PathBuf,

    /// Directory holding `<session>.log` message logs
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Automatic reply to incoming messages; `{session}` is replaced by the session id
    #[serde(default = "default_reply_template")]
    pub reply_template: String,

    /// Also draw login QR codes in the log output
    #[serde(default = "default_true")]
    pub print_qr_in_terminal: bool,
}

fn default_session() -> String {
    "session1".to_string()
}

fn default_auth_dir() -> PathBuf {
    PathBuf::from("auth")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_reply_template() -> String {
    "Hello from session {session}!".to_string()
}

const fn default_true() -> bool {
    true
}

impl SessionsConfig {
    pub fn reply_for(&self, session_id: &str) -> String {
        self.reply_template.replace("{session}", session_id)
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            default_session: default_session(),
            auth_dir: default_auth_dir(),
            log_dir: default_log_dir(),
            reply_template: default_reply_template(),
            print_qr_in_terminal: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::Text,
        }
    }
}

//! HTTP server entry point.
//!
//! Starts the default session, then serves the session API until Ctrl+C or
//! SIGTERM.

use std::sync::Arc;

use tokio::{net::TcpListener, signal};
use tracing::info;

use whatsapp_sessions::{
    client::ClientFactory,
    config::AppConfig,
    http::{create_router, AppState},
    logging::init_logging,
    SessionManager,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        auth_dir = %config.sessions.auth_dir.display(),
        "starting whatsapp-sessions"
    );

    let manager = SessionManager::new(
        config.sessions.clone(),
        config.reconnect.clone(),
        client_factory(),
    );
    manager.start(&config.sessions.default_session).await?;

    let app = create_router(AppState::new(manager, config.server.index_file.clone()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "server is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

#[cfg(feature = "whatsapp-web")]
fn client_factory() -> Arc<dyn ClientFactory> {
    Arc::new(whatsapp_sessions::client::web::WebClientFactory)
}

#[cfg(not(feature = "whatsapp-web"))]
fn client_factory() -> Arc<dyn ClientFactory> {
    tracing::warn!("built without the whatsapp-web feature; sessions run offline and cannot pair");
    Arc::new(whatsapp_sessions::client::DefaultClientFactory)
}

/// Resolves on the first of Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

//! DocReader Server
//!
//! Converts DOCX, DOC and RTF documents to PDF on request, entirely in
//! memory, for display in the document viewer.

use std::net::SocketAddr;

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docreader_server::config::Config;
use docreader_server::routes;
use docreader_server::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "docreader_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting DocReader Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Content root: {}", config.conversion.root_dir.display());
    match config.conversion.timeout() {
        Some(limit) => tracing::info!("Conversion timeout: {}s", limit.as_secs()),
        None => tracing::info!("Conversion timeout disabled"),
    }

    let app_state = AppState::new(config.clone()).expect("Failed to initialize application state");

    // Resolve fonts before the first request
    let fonts = app_state.fonts().clone();
    tracing::debug!("Font search locations: {:?}", fonts.search_paths());
    tokio::task::spawn_blocking(move || fonts.resolve())
        .await
        .expect("Font discovery task panicked");

    let app = routes::router(app_state);

    let host: std::net::IpAddr = config.server.host.parse().unwrap_or_else(|e| {
        tracing::warn!("Invalid DOCREADER_HOST {:?}: {}, binding 0.0.0.0", config.server.host, e);
        [0, 0, 0, 0].into()
    });
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!(
        "DocReader Server listening on {} (convert endpoint {}/convert)",
        addr,
        config.server.base_url
    );

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    tracing::info!("Server shutdown complete");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

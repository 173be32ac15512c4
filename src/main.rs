mod api;
mod config;
mod ingest;
mod reviews;
mod storage;
mod token;

use crate::api::AppState;
use crate::config::AppConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("🚀 Starting review request server");

    // Load configuration
    let config = AppConfig::load()?;
    info!("📋 Configuration loaded");
    info!("   - Company: {} ({})", config.company.name, config.company.id);
    info!("   - Publish link: {}", config.company.publish_link);
    info!("   - Frontend: {}", config.frontend.dir.display());
    if let Some(url) = &config.server.public_url {
        info!("   - Public URL: {}", url);
    }

    // In-memory store, seeded with the configured company
    let addr = config.bind_addr();
    let state = AppState::new(config);
    info!("💾 In-memory store ready (state resets on restart)");

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📡 Available endpoints:");
    info!("   GET  /health            - Health check");
    info!("   POST /api/upload        - Upload contact CSV");
    info!("   GET  /api/stats         - Request and rating stats");
    info!("   POST /api/send-all      - Send pending review requests");
    info!("   GET  /api/r/:token      - Rating page data");
    info!("   POST /api/rate          - Submit a rating");
    info!("   GET  /api/_dump         - Dump in-memory store");
    info!("   GET  /r/:token          - Rating page");
    info!("");
    info!("✨ Server is ready to accept requests!");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutting down gracefully");

    Ok(())
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}

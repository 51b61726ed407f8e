use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use common::convert::ExternalToolConverter;
use common::storage::UploadStore;
use server::config::AppConfig;
use server::services::access::AccessPolicy;
use server::services::pending::PendingUploads;
use server::state::AppState;
use server::{build_router, database, seed, sweeper};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("server=info,common=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    seed::seed_universities(&db).await?;
    seed::ensure_indexes(&db).await?;

    let uploads = UploadStore::new(
        PathBuf::from(&config.upload.storage_dir),
        config.upload.max_file_size,
    )
    .await
    .with_context(|| format!("Failed to open upload root {}", config.upload.storage_dir))?;
    info!(root = %uploads.root().display(), "Upload storage ready");

    let state = AppState {
        db,
        uploads: Arc::new(uploads),
        converter: Arc::new(ExternalToolConverter::new(config.converter.clone())),
        pending: Arc::new(PendingUploads::new()),
        access: Arc::new(AccessPolicy::new(config.access.clone())),
        config,
    };

    tokio::spawn(sweeper::run(state.clone()));

    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .context("Invalid server address")?;
    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM signal handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = terminate => "SIGTERM",
    };
    info!("Received {signal}, shutting down");
}

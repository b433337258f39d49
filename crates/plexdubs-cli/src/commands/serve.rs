use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use plex_dubs_config::{Config, PathManager};
use plex_dubs_core::{EventProcessor, RegistryStorage};
use plex_dubs_sources::PlexCollectionBackend;
use plexdubs_cli::{build_router, AppState};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run_serve(config_file: Option<&Path>, listen: Option<String>) -> Result<()> {
    let config = Config::load(config_file).wrap_err("Configuration is invalid")?;

    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create data directories: {:#}", e))?;

    for target in config.targets() {
        info!(
            operation = "collection_configured",
            library_kind = %target.library_kind,
            library = %target.library_section,
            collection = %target.collection_name,
            max_size = target.max_size,
            "Managing collection"
        );
    }

    let backend = PlexCollectionBackend::connect(&config)
        .await
        .map_err(|e| eyre!("{:#}", e))?;

    let storage = RegistryStorage::new(path_manager.registry_file());
    let processor = EventProcessor::from_config(&config, Arc::new(backend), Some(storage))
        .map_err(|e| eyre!("Failed to load dedup registry: {:#}", e))?;

    let addr = listen.unwrap_or_else(|| config.listen_addr.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;

    info!(operation = "server_started", addr = %addr, "Listening for webhooks");

    let app = build_router(AppState::new(Arc::new(config), processor));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server error")?;

    info!(operation = "server_stopped", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(operation = "shutdown_requested", "Shutting down, finishing in-flight requests");
}

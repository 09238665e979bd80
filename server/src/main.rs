mod config;
mod logging;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use config::{Config, TlsPaths};
use datastore::RevalidatePolicy;
use mock_upstream::MockPlaylists;
use page_service::AppState;
use playlist_fetcher::{PlaylistQuery, YouTubeFetcher};
use tracing::info;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config = Config::from_env()?;
    let fetcher = YouTubeFetcher::new(
        config.api_base.clone(),
        PlaylistQuery::new(config.playlist_id.clone(), config.api_key.clone()),
    )?;
    info!(
        playlist_id = %config.playlist_id,
        endpoint = %fetcher.endpoint(),
        revalidate_secs = config.revalidate_after.as_secs(),
        "playlist source configured"
    );

    let state = AppState::new(
        Arc::new(fetcher),
        RevalidatePolicy {
            revalidate_after: config.revalidate_after,
        },
    );
    let mut app = page_service::create_router(state);
    if config.mock_upstream {
        info!("serving mock playlist upstream");
        app = app.merge(mock_upstream::create_router(Arc::new(MockPlaylists::new())));
    }

    match &config.tls {
        Some(tls) => serve_tls(app, config.bind_addr, tls).await,
        None => serve(app, config.bind_addr).await,
    }
}

async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn serve_tls(app: Router, addr: SocketAddr, tls: &TlsPaths) -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;
    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .context("failed to load TLS certificate or key")?;

    let handle = axum_server::Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown_signal().await;
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    info!("Server listening on https://{}", addr);
    axum_server::bind_rustls(addr, rustls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

mod config;

use std::sync::Arc;

use tracing::info;

use chirpy_api::{AppStateInner, AuthGateway};
use chirpy_auth::TokenService;
use chirpy_db::Store;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chirpy_server=debug,chirpy_api=debug,chirpy_auth=info,chirpy_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // A corrupt store file stops startup here.
    let store = Arc::new(Store::open(&config.db_path)?);
    let tokens = TokenService::new(&config.jwt_secret);
    let gateway = AuthGateway::new(store, tokens);
    let state = Arc::new(AppStateInner::new(gateway, config.polka_key));

    let app = chirpy_api::router(state, &config.file_root);

    info!("Chirpy listening on {}", config.addr);
    info!("Serving static files from {}", config.file_root.display());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

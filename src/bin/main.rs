use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use describo::{AppState, build_app, cleanup_inactive_rooms, config::ServerConfig};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "describo=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::parse();
    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);
    if config.results_url.is_none() {
        tracing::info!(
            file = %config.results_file.display(),
            "No results URL configured, writing quiz results to file"
        );
    }

    let state = Arc::new(AppState {
        room_ttl: config.room_ttl(),
        ..AppState::with_sink(config.result_sink())
    });
    let cleanup_state = state.clone();
    let app = build_app(state, &config.public_dir);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            cleanup_inactive_rooms(&cleanup_state).await;
        }
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

//! Describo
//!
//! A two-player word description game served over WebSockets with Axum.
//!
//! # Game Flow
//!
//! 1. **Session Creation**: A player opens a WebSocket and sends `create-session`
//! 2. **Joining**: A second player joins with the shared six letter code
//! 3. **Rounds**: Eight timed rounds; the describer sees a secret word, the
//!    guesser types guesses. Rounds 1-4 use English words, 5-8 Spanish words
//! 4. **Recall Quiz**: After the last round each player submits a quiz over the
//!    guessed words, which is handed to the result sink
//!
//! # Modules
//!
//! - [`api`] - Wire messages and HTTP routes
//! - [`game`] - Session engine: rooms, word pools, clock, views, registry
//! - [`net`] - Connections and the WebSocket transport
//! - [`results`] - Persistence of quiz results
//! - [`config`] - Command line / environment configuration

pub mod api;
pub mod config;
pub mod error;
pub mod game;
pub mod net;
pub mod player;
pub mod results;

use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{any, get},
};
use tokio::sync::Mutex;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
};

pub use game::{GamePhase, registry::SessionRegistry, room::Room};
pub use player::*;

use crate::{
    api::routes::session_info,
    net::{connection::Hangups, ws::handler::ws_upgrade_handler},
    results::{LogSink, ResultSink},
};

/// Sessions without an inbound command for this long are dropped.
pub const DEFAULT_ROOM_TTL: Duration = Duration::from_secs(60 * 60);

pub struct AppState {
    pub registry: Mutex<SessionRegistry>,
    pub sink: Arc<dyn ResultSink>,
    pub room_ttl: Duration,
    pub hangups: Hangups,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(LogSink))
    }

    pub fn with_sink(sink: Arc<dyn ResultSink>) -> Self {
        Self {
            registry: Mutex::new(SessionRegistry::new()),
            sink,
            room_ttl: DEFAULT_ROOM_TTL,
            hangups: Hangups::default(),
        }
    }
}

/// Drops idle sessions and closes the connections that were seated in them.
pub async fn cleanup_inactive_rooms(state: &Arc<AppState>) {
    let removed = state.registry.lock().await.reap_idle(state.room_ttl);

    if removed.is_empty() {
        tracing::trace!("No inactive rooms to clean up");
        return;
    }
    for room in &removed {
        for entry in &room.players {
            state.hangups.hang_up(entry.player.id).await;
        }
    }
    tracing::info!(count = removed.len(), "Cleaned up inactive rooms");
}

pub fn build_app(state: Arc<AppState>, public_dir: &Path) -> Router {
    let api_routes = Router::new()
        .route("/ws", any(ws_upgrade_handler))
        .route("/sessions/{code}", get(session_info))
        .with_state(state);

    Router::new()
        .route("/health", get(|| async { "Server is up" }))
        .nest("/api/v1", api_routes)
        .fallback_service(
            ServeDir::new(public_dir)
                .not_found_service(ServeFile::new(public_dir.join("index.html"))),
        )
        .layer(CorsLayer::permissive())
}

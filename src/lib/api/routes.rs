use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, GamePhase, Player, net::connection::RoomCode};

#[derive(Serialize, Deserialize, Debug)]
pub struct RoomParams {
    pub code: String,
}

/// Public summary of a session, used by clients to check a code before joining.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: RoomCode,
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub joinable: bool,
    /// Seconds since the last inbound command.
    pub idle_secs: u64,
}

#[tracing::instrument(skip(state))]
pub async fn session_info(
    State(state): State<Arc<AppState>>,
    Path(params): Path<RoomParams>,
) -> Response {
    let code = RoomCode::from(params.code);
    let registry = state.registry.lock().await;
    let Some(room) = registry.get(&code) else {
        return (StatusCode::NOT_FOUND, "Session does not exist").into_response();
    };

    let info = SessionInfo {
        session_id: room.code.clone(),
        phase: room.phase,
        players: room.players.iter().map(|e| e.player.clone()).collect(),
        joinable: room.phase == GamePhase::Waiting && !room.is_full(),
        idle_secs: room
            .last_activity
            .elapsed()
            .map(|d| d.as_secs())
            .unwrap_or_default(),
    };
    Json(info).into_response()
}

//! Per-player projection of a room.
//!
//! Every `state-update` a client receives is built here. The guesser's copy has
//! the secret replaced by [`HIDDEN_WORD`] before it is queued for sending, so
//! the real word never leaves the server on the guesser's connection.

use serde::{Deserialize, Serialize};

use crate::{
    Player, PlayerId,
    game::{GamePhase, MAX_ROUNDS, room::Room, words::{self, Language}},
    net::connection::RoomCode,
};

/// Placeholder shown to the guesser in place of the secret word.
pub const HIDDEN_WORD: &str = "???";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub session_id: RoomCode,
    pub players: Vec<Player>,
    pub phase: GamePhase,
    pub round: u32,
    pub max_rounds: u32,
    pub describer: Option<PlayerId>,
    pub secret_word: Option<String>,
    pub secret_language: Option<Language>,
    pub translation: Option<String>,
    pub time_remaining: u32,
    pub team_score: u32,
    pub round_guessed_words: Vec<String>,
    pub all_guessed_words: Vec<String>,
    pub replay_votes: usize,
    pub in_transition: bool,
    pub is_describer: bool,
    pub is_guesser: bool,
}

pub fn project_for(room: &Room, player_id: PlayerId) -> PlayerView {
    let playing = room.phase == GamePhase::Playing;
    let is_describer = playing && room.is_describer(player_id);
    let is_guesser = playing && !is_describer;

    let (secret_word, translation) = match &room.secret {
        Some(_) if is_guesser => (Some(HIDDEN_WORD.to_string()), None),
        Some(secret) => (
            Some(secret.word.to_string()),
            words::translate(secret.word, secret.language).map(str::to_string),
        ),
        None => (None, None),
    };

    PlayerView {
        session_id: room.code.clone(),
        players: room.players.iter().map(|e| e.player.clone()).collect(),
        phase: room.phase,
        round: room.round,
        max_rounds: MAX_ROUNDS,
        describer: room.describer().map(|p| p.id),
        secret_word,
        secret_language: room.secret.as_ref().map(|s| s.language),
        translation,
        time_remaining: room.time_remaining,
        team_score: room.team_score,
        round_guessed_words: room.round_guessed.clone(),
        all_guessed_words: room.all_guessed.clone(),
        replay_votes: room.replay_votes.len(),
        in_transition: room.in_transition(),
        is_describer,
        is_guesser,
    }
}

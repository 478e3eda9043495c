use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{api::messages::GameEvent, player::PlayerId, results::TestResult};

pub mod clock;
pub mod guess;
pub mod registry;
pub mod room;
pub mod view;
pub mod words;

/// Seats per session.
pub const MAX_PLAYERS: usize = 2;
/// Rounds per game. The first half is played in English, the second in Spanish.
pub const MAX_ROUNDS: u32 = 8;
/// Length of one round in seconds.
pub const ROUND_SECONDS: u32 = 90;
/// Countdown between two rounds in seconds.
pub const TRANSITION_SECONDS: u32 = 10;

/// Everything a room wants sent (or stored) as the result of one command or tick.
#[derive(Clone, Debug, Default)]
pub struct RoomResponse {
    pub messages_to_players: Vec<GameEvent>,
    pub messages_to_specific: Vec<(PlayerId, GameEvent)>,
    pub results: Vec<TestResult>,
}

impl RoomResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcast(msg: GameEvent) -> Self {
        Self {
            messages_to_players: vec![msg],
            ..Self::default()
        }
    }

    pub fn to_player(player_id: PlayerId, msg: GameEvent) -> Self {
        Self {
            messages_to_specific: vec![(player_id, msg)],
            ..Self::default()
        }
    }

    pub fn with_result(result: TestResult) -> Self {
        Self {
            results: vec![result],
            ..Self::default()
        }
    }

    pub fn merge(mut self, other: RoomResponse) -> Self {
        self.messages_to_players.extend(other.messages_to_players);
        self.messages_to_specific.extend(other.messages_to_specific);
        self.results.extend(other.results);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.messages_to_players.is_empty()
            && self.messages_to_specific.is_empty()
            && self.results.is_empty()
    }

    /// All events addressed to `player_id`, broadcasts first, in dispatch order.
    pub fn events_for(&self, player_id: PlayerId) -> Vec<&GameEvent> {
        self.messages_to_players
            .iter()
            .chain(
                self.messages_to_specific
                    .iter()
                    .filter(|(pid, _)| *pid == player_id)
                    .map(|(_, msg)| msg),
            )
            .collect()
    }
}

#[derive(Clone, Copy, Deserialize, Serialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    #[default]
    Waiting,
    Playing,
    Finished,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

use serde::{Deserialize, Serialize};

use crate::{
    game::view::PlayerView, net::connection::RoomCode, player::PlayerId, results::QuizAnswer,
};

/// Any frame a client may send.
///
/// Lobby commands are handled by the session registry; game commands are
/// forwarded to the room the connection is seated in.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ClientMessage {
    Lobby(LobbyCommand),
    Game(GameCommand),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum LobbyCommand {
    CreateSession {
        player_name: String,
    },
    JoinSession {
        session_id: String,
        player_name: String,
    },
    Leave,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum GameCommand {
    Start,
    SubmitGuess {
        text: String,
    },
    Skip,
    VoteReplay,
    SubmitQuiz {
        answers: Vec<QuizAnswer>,
        native_language: String,
    },
}

impl GameCommand {
    /// Short name used in logs and rejection messages.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::SubmitGuess { .. } => "guess",
            Self::Skip => "skip",
            Self::VoteReplay => "vote to play again",
            Self::SubmitQuiz { .. } => "submit the quiz",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum GameEvent {
    SessionCreated {
        session_id: RoomCode,
        player_id: PlayerId,
    },
    SessionJoined {
        session_id: RoomCode,
        player_id: PlayerId,
    },
    StateUpdate(PlayerView),
    TimerTick {
        seconds_left: u32,
    },
    RoundTransition {
        next_describer: String,
        countdown: u32,
        words_this_round: Vec<String>,
    },
    RoundTransitionEnded,
    GuessResult {
        correct: bool,
    },
    ReplayVotes {
        votes: usize,
        needed: usize,
    },
    PlayerLeft {
        name: String,
    },
    QuizAccepted,
    Rejected {
        reason: String,
    },
}

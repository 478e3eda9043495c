use thiserror::Error;

use crate::{game::GamePhase, net::connection::RoomCode};

/// Reasons a single inbound command is refused.
///
/// None of these are fatal: the command is dropped, the session is left as it
/// was, and the originating connection receives a `rejected` event carrying
/// the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("session {0} does not exist")]
    RoomNotFound(RoomCode),

    #[error("session {0} is full")]
    RoomFull(RoomCode),

    #[error("cannot {action} while the session is {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: GamePhase,
    },

    #[error("cannot {action} between rounds")]
    BetweenRounds { action: &'static str },

    /// The connection is not seated in any session.
    #[error("not a member of a session")]
    NotAuthorized,

    #[error("already a member of session {0}")]
    AlreadyInSession(RoomCode),

    #[error("two players are required to start")]
    NotEnoughPlayers,

    #[error("the describer cannot submit guesses")]
    DescriberCannotGuess,

    #[error("quiz already submitted for this game")]
    QuizAlreadySubmitted,

    #[error("player name must not be empty")]
    InvalidName,

    /// A fault while processing the command that was caught at the routing boundary.
    #[error("internal error while processing the command")]
    Internal,
}

impl GameError {
    pub fn invalid_phase(action: &'static str, phase: GamePhase) -> Self {
        Self::InvalidPhase { action, phase }
    }
}

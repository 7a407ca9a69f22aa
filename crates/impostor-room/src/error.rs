//! Error types for the room layer.

use impostor_protocol::{Phase, PlayerId, RoomCode};

/// Errors that can occur during room operations.
///
/// Every variant is local to the one event that caused it: the room is
/// left unchanged and only the sender hears about it.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The input itself is unacceptable (empty name, empty hint, vote for
    /// someone who is not in the room).
    #[error("{0}")]
    Validation(String),

    /// No active room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The connection is not a member of any room.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// A connection may only be in one room at a time.
    #[error("player {0} is already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    /// Joins are only accepted while the room is waiting.
    #[error("game in room {0} already started")]
    GameInProgress(RoomCode),

    /// The event does not fit the room's current phase.
    #[error("cannot {action} while the room is {phase}")]
    WrongPhase { action: &'static str, phase: Phase },

    /// Start was requested with too few players.
    #[error("not enough players: need {required}, have {current}")]
    NotEnoughPlayers { required: usize, current: usize },

    /// Only the host may start a round.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

impl RoomError {
    /// HTTP-style code sent to the client in `ServerMessage::Error`.
    pub fn code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) | Self::NotInRoom(_) => 404,
            Self::AlreadyInRoom(..)
            | Self::GameInProgress(_)
            | Self::WrongPhase { .. }
            | Self::NotEnoughPlayers { .. }
            | Self::NotHost(_) => 409,
            Self::Unavailable(_) => 503,
        }
    }
}

/// Errors from loading a word list.
#[derive(Debug, thiserror::Error)]
pub enum WordListError {
    #[error("cannot read word list: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse word list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("word list contains no words")]
    Empty,
}

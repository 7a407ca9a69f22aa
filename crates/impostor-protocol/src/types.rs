//! Identity and phase types shared by the server and its clients.
//!
//! Everything here travels on the wire inside a message, so each type
//! carries serde derives and a JSON shape the browser client can read
//! without any adapter code.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a connected player.
///
/// One `PlayerId` is handed out per connection and stays stable for the
/// lifetime of that connection. There is no account behind it: when the
/// socket closes, the id is gone for good.
///
/// `#[serde(transparent)]` serializes `PlayerId(42)` as plain `42`, so
/// the client can use it directly as the `target` of a vote.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Short, human-typeable code that identifies an active room.
///
/// Codes are upper-case ASCII alphanumerics. Players type them by hand,
/// so [`RoomCode::parse`] is forgiving about case and surrounding
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes a user-typed code: trims whitespace and upper-cases it.
    ///
    /// Returns `None` if nothing is left or the code contains anything
    /// other than ASCII letters and digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(code))
    }

    /// Wraps an already-normalized code. Used by the code generator.
    pub fn from_normalized(code: String) -> Self {
        Self(code)
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Phase: where a room is in its round
// ---------------------------------------------------------------------------

/// The stage a room is in.
///
/// ```text
///   Waiting ──start──→ Hinting ──all hints──→ Voting ──all votes──→ Finished
///                         ↑                                             │
///                         └────────────────────start────────────────────┘
/// ```
///
/// `Waiting` and `Finished` both accept a start, which always lands in
/// `Hinting`. The hinting → voting → finished steps are never triggered
/// directly by a client; they happen when the last hint or vote arrives.
/// Outside this cycle, a room goes back to `Waiting` from any phase when
/// the impostor leaves or the last member does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Waiting,
    Hinting,
    Voting,
    Finished,
}

impl Phase {
    /// Returns `true` if new players may join.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if a round may be started from this phase.
    pub fn can_start(self) -> bool {
        matches!(self, Self::Waiting | Self::Finished)
    }

    /// Returns `true` if moving to `target` follows the state machine.
    ///
    /// The only edges are the ones in the diagram above: a start from
    /// `Waiting` or `Finished`, and the two automatic steps. Falling back
    /// to `Waiting` is not a transition in this sense.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Waiting | Self::Finished, Self::Hinting) => true,
            (Self::Hinting, Self::Voting) => true,
            (Self::Voting, Self::Finished) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Hinting => write!(f, "hinting"),
            Self::Voting => write!(f, "voting"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive a message?
// ---------------------------------------------------------------------------

/// Specifies who should receive a server message.
///
/// The room state machine returns `(Recipient, ServerMessage)` pairs and
/// the room actor fans them out to the member channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every member of the room.
    All,

    /// One specific member.
    Player(PlayerId),
}

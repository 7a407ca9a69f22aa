//! Room configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every room a directory creates.
///
/// `Default` gives the standard game: three players to start, six
/// character room codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Minimum players required to start a round. Never below
    /// [`RoomConfig::MIN_PLAYERS_FLOOR`].
    pub min_players: usize,

    /// Length of generated room codes.
    pub code_length: usize,

    /// Maximum display name length, in characters, after trimming.
    pub max_name_len: usize,

    /// Maximum hint length, in characters, after trimming.
    pub max_hint_len: usize,

    /// Capacity of each room actor's command channel. When it fills up,
    /// callers wait (bounded channel backpressure).
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 3,
            code_length: 6,
            max_name_len: 24,
            max_hint_len: 64,
            channel_size: 64,
        }
    }
}

impl RoomConfig {
    /// A round needs an impostor and at least two players who know the word.
    pub const MIN_PLAYERS_FLOOR: usize = 3;

    /// Shortest room code we will generate.
    pub const MIN_CODE_LENGTH: usize = 4;

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by [`RoomDirectory::new`](crate::RoomDirectory::new).
    pub fn validated(mut self) -> Self {
        if self.min_players < Self::MIN_PLAYERS_FLOOR {
            tracing::warn!(
                min_players = self.min_players,
                floor = Self::MIN_PLAYERS_FLOOR,
                "min_players below floor, raising"
            );
            self.min_players = Self::MIN_PLAYERS_FLOOR;
        }
        if self.code_length < Self::MIN_CODE_LENGTH {
            tracing::warn!(
                code_length = self.code_length,
                "code_length too short, raising"
            );
            self.code_length = Self::MIN_CODE_LENGTH;
        }
        self.max_name_len = self.max_name_len.max(1);
        self.max_hint_len = self.max_hint_len.max(1);
        self.channel_size = self.channel_size.max(1);
        self
    }
}

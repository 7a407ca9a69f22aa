//! Connection registry: which connection is in which room, and under
//! what name.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is a plain `HashMap` wrapper and is not
//! thread-safe by itself. The [`RoomDirectory`](crate::RoomDirectory)
//! owns it behind its own mutex, separate from the room map, because it
//! is the one structure that every room's events touch.

use std::collections::HashMap;

use impostor_protocol::{PlayerId, RoomCode};

use crate::RoomError;

/// What the server knows about a connection that is in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub room: RoomCode,
}

/// Index from connection to room membership.
///
/// Every membership change goes through here, which is what makes
/// "which room is this connection in" a single map lookup.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<PlayerId, Registration>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `player` joined `room`.
    ///
    /// # Errors
    /// [`RoomError::AlreadyInRoom`] if the connection is already a member
    /// somewhere.
    pub fn register(
        &mut self,
        player: PlayerId,
        name: String,
        room: RoomCode,
    ) -> Result<(), RoomError> {
        if let Some(existing) = self.entries.get(&player) {
            return Err(RoomError::AlreadyInRoom(player, existing.room.clone()));
        }
        self.entries.insert(player, Registration { name, room });
        Ok(())
    }

    /// Forgets a connection's membership, returning what was recorded.
    pub fn unregister(&mut self, player: PlayerId) -> Option<Registration> {
        self.entries.remove(&player)
    }

    /// The room a connection is in.
    pub fn room_of(&self, player: PlayerId) -> Option<&RoomCode> {
        self.entries.get(&player).map(|r| &r.room)
    }

    /// The display name a connection joined with.
    pub fn name_of(&self, player: PlayerId) -> Option<&str> {
        self.entries.get(&player).map(|r| r.name.as_str())
    }

    /// Drops every entry pointing at `room`. Returns how many were removed.
    pub fn remove_room(&mut self, room: &RoomCode) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, r| &r.room != room);
        before - self.entries.len()
    }

    /// Number of connections currently in a room.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

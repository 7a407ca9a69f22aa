//! Room directory: creates rooms, resolves codes and connections to
//! rooms, and destroys rooms once they are empty.

use std::collections::HashMap;
use std::sync::Arc;

use impostor_protocol::{PlayerId, RoomCode};
use rand::Rng;
use tokio::sync::{Mutex, RwLock};

use crate::game::validate_name;
use crate::room::spawn_room;
use crate::{ConnectionRegistry, PlayerSender, RoomConfig, RoomError, RoomHandle, WordSource};

/// Characters room codes are drawn from.
const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates a random room code of `len` characters.
///
/// Not unique on its own; [`RoomDirectory::create_room`] retries until
/// the code is free.
pub fn generate_code(len: usize, rng: &mut impl Rng) -> RoomCode {
    let code = (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    RoomCode::from_normalized(code)
}

fn unique_code(rooms: &HashMap<RoomCode, RoomHandle>, len: usize) -> RoomCode {
    let mut rng = rand::rng();
    loop {
        let code = generate_code(len, &mut rng);
        if !rooms.contains_key(&code) {
            return code;
        }
        tracing::debug!(room_code = %code, "room code collision, retrying");
    }
}

/// All active rooms, plus the connection index.
///
/// This is the entry point for every inbound event. It is meant to be
/// shared as `Arc<RoomDirectory>`: the room map and the connection index
/// each sit behind their own lock, and neither lock is held while waiting
/// on a room actor.
pub struct RoomDirectory {
    /// Active rooms, keyed by code.
    rooms: RwLock<HashMap<RoomCode, RoomHandle>>,

    /// Which connection is in which room. A connection is in at most one.
    connections: Mutex<ConnectionRegistry>,

    config: RoomConfig,
    words: Arc<dyn WordSource>,
}

impl RoomDirectory {
    /// Creates an empty directory. `config` is validated first.
    pub fn new(config: RoomConfig, words: Arc<dyn WordSource>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            connections: Mutex::new(ConnectionRegistry::new()),
            config: config.validated(),
            words,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a new room with `player` as its host and only member.
    ///
    /// The host receives `RoomCreated` on `sender`.
    pub async fn create_room(
        &self,
        player: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<(RoomCode, RoomHandle), RoomError> {
        self.ensure_not_in_room(player).await?;
        let name = validate_name(&self.config, name)?;

        let handle = {
            let mut rooms = self.rooms.write().await;
            let code = unique_code(&rooms, self.config.code_length);
            let handle = spawn_room(
                code.clone(),
                self.config.clone(),
                Arc::clone(&self.words),
                player,
                &name,
                sender,
            )?;
            rooms.insert(code, handle.clone());
            handle
        };
        let code = handle.code().clone();

        let registered = self
            .connections
            .lock()
            .await
            .register(player, name, code.clone());
        if let Err(e) = registered {
            self.undo_join(&handle, player).await;
            return Err(e);
        }

        tracing::info!(room_code = %code, %player, "room created");
        Ok((code, handle))
    }

    /// Adds `player` to the room with the given code.
    pub async fn join_room(
        &self,
        code: &RoomCode,
        player: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<RoomHandle, RoomError> {
        self.ensure_not_in_room(player).await?;
        let handle = self
            .find_by_code(code)
            .await
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let name = validate_name(&self.config, name)?;

        handle
            .join(player, &name, sender)
            .await
            .map_err(|e| match e {
                RoomError::Unavailable(code) => RoomError::NotFound(code),
                other => other,
            })?;

        let registered = self
            .connections
            .lock()
            .await
            .register(player, name, code.clone());
        if let Err(e) = registered {
            self.undo_join(&handle, player).await;
            return Err(e);
        }
        Ok(handle)
    }

    /// Looks up a room by code.
    pub async fn find_by_code(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Looks up the room a connection is in, through the connection index.
    pub async fn find_by_connection(&self, player: PlayerId) -> Option<RoomHandle> {
        self.room_for(player).await.ok()
    }

    /// The code of the room a connection is in.
    pub async fn room_code_of(&self, player: PlayerId) -> Option<RoomCode> {
        self.connections.lock().await.room_of(player).cloned()
    }

    pub async fn start_game(&self, player: PlayerId) -> Result<(), RoomError> {
        self.room_for(player).await?.start_game(player).await
    }

    pub async fn submit_hint(&self, player: PlayerId, hint: &str) -> Result<(), RoomError> {
        self.room_for(player).await?.submit_hint(player, hint).await
    }

    pub async fn submit_vote(&self, player: PlayerId, target: PlayerId) -> Result<(), RoomError> {
        self.room_for(player)
            .await?
            .submit_vote(player, target)
            .await
    }

    /// Takes `player` out of their room. Used both for an explicit leave
    /// and when the connection drops. Destroys the room if it is now empty.
    pub async fn leave(&self, player: PlayerId) -> Result<(), RoomError> {
        let registration = self
            .connections
            .lock()
            .await
            .unregister(player)
            .ok_or(RoomError::NotInRoom(player))?;
        let code = registration.room;

        let Some(handle) = self.find_by_code(&code).await else {
            return Ok(());
        };
        let remaining = handle.leave(player).await?;
        if remaining == 0 {
            self.remove_if_empty(&code).await;
        }
        Ok(())
    }

    /// Destroys the room if it has no players left (or its actor is gone).
    /// Returns `true` if the room was removed.
    pub async fn remove_if_empty(&self, code: &RoomCode) -> bool {
        let Some(handle) = self.find_by_code(code).await else {
            return false;
        };
        let empty = match handle.info().await {
            Ok(info) => info.player_count() == 0,
            Err(_) => true,
        };
        if !empty {
            return false;
        }

        self.rooms.write().await.remove(code);
        let stale = self.connections.lock().await.remove_room(code);
        if stale > 0 {
            tracing::warn!(room_code = %code, stale, "dropped index entries of destroyed room");
        }
        let _ = handle.shutdown().await;
        tracing::info!(room_code = %code, "room destroyed");
        true
    }

    /// Number of active rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Codes of all active rooms.
    pub async fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Number of connections currently in some room.
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    async fn ensure_not_in_room(&self, player: PlayerId) -> Result<(), RoomError> {
        match self.connections.lock().await.room_of(player) {
            Some(code) => Err(RoomError::AlreadyInRoom(player, code.clone())),
            None => Ok(()),
        }
    }

    async fn room_for(&self, player: PlayerId) -> Result<RoomHandle, RoomError> {
        let code = self
            .room_code_of(player)
            .await
            .ok_or(RoomError::NotInRoom(player))?;
        self.find_by_code(&code)
            .await
            .ok_or(RoomError::NotFound(code))
    }

    /// Undoes a join whose index update lost a race.
    async fn undo_join(&self, handle: &RoomHandle, player: PlayerId) {
        if let Ok(0) = handle.leave(player).await {
            self.remove_if_empty(handle.code()).await;
        }
    }
}

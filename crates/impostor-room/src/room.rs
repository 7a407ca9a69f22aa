//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Each room runs in its own task, fed through a bounded mpsc channel.
//! Commands are handled one at a time, and a command's notifications are
//! delivered before the next command is read. That is the whole
//! serialization story for a room: no locks around game state.

use std::collections::HashMap;
use std::sync::Arc;

use impostor_protocol::{Phase, PlayerId, Recipient, RoomCode, RoundResult, ServerMessage};
use tokio::sync::{mpsc, oneshot};

use crate::game::{Outbound, Room};
use crate::{RoomConfig, RoomError, WordSource};

/// Channel sender for delivering outbound messages to a player's
/// connection. The connection handler drains the other end.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Commands sent to a room actor through its channel.
///
/// Every variant except `Shutdown` carries a reply channel, so a rejected
/// event always gets back to the caller that sent it.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: Reply<()>,
    },
    /// Replies with the number of players left.
    Leave {
        player_id: PlayerId,
        reply: Reply<usize>,
    },
    Start {
        player_id: PlayerId,
        reply: Reply<()>,
    },
    Hint {
        player_id: PlayerId,
        hint: String,
        reply: Reply<()>,
    },
    Vote {
        player_id: PlayerId,
        target: PlayerId,
        reply: Reply<()>,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// A point-in-time view of a room, including the secret parts.
///
/// Server-side only: used by the directory and by tests. Never sent to
/// clients.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: Phase,
    pub round: u32,
    pub host: Option<PlayerId>,
    pub players: Vec<PlayerId>,
    pub impostor: Option<PlayerId>,
    pub word: Option<String>,
    pub hints: usize,
    pub votes: usize,
    pub last_result: Option<RoundResult>,
}

impl RoomInfo {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

/// Handle to a running room actor.
///
/// Cheap to clone: it is an `mpsc::Sender` plus the room code. The
/// directory holds one per room and hands out clones.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The code of the room this handle talks to.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Sends a command and waits for the actor's reply.
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Adds a player. `sender` receives everything the room sends them.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let name = name.to_string();
        self.request(|reply| RoomCommand::Join {
            player_id,
            name,
            sender,
            reply,
        })
        .await
    }

    /// Removes a player and returns how many are left.
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await
    }

    pub async fn start_game(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { player_id, reply })
            .await
    }

    pub async fn submit_hint(&self, player_id: PlayerId, hint: &str) -> Result<(), RoomError> {
        let hint = hint.to_string();
        self.request(|reply| RoomCommand::Hint {
            player_id,
            hint,
            reply,
        })
        .await
    }

    pub async fn submit_vote(&self, player_id: PlayerId, target: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Vote {
            player_id,
            target,
            reply,
        })
        .await
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Tells the room to stop.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    /// Per-player outbound channels.
    senders: HashMap<PlayerId, PlayerSender>,
    words: Arc<dyn WordSource>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Set once the last player leaves. A closed room only answers
    /// `GetInfo` and waits for `Shutdown`.
    closed: bool,
}

impl RoomActor {
    async fn run(mut self) {
        let code = self.room.code().clone();
        tracing::info!(room_code = %code, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room_code = %code, "room shutting down");
                    break;
                }
                cmd if self.closed => self.reject_closed(cmd),
                RoomCommand::Join {
                    player_id,
                    name,
                    sender,
                    reply,
                } => {
                    let _ = reply.send(self.handle_join(player_id, &name, sender));
                }
                RoomCommand::Leave { player_id, reply } => {
                    let _ = reply.send(self.handle_leave(player_id));
                }
                RoomCommand::Start { player_id, reply } => {
                    let _ = reply.send(self.handle_start(player_id));
                }
                RoomCommand::Hint {
                    player_id,
                    hint,
                    reply,
                } => {
                    let result = self.room.submit_hint(player_id, &hint);
                    let _ = reply.send(self.deliver(result));
                }
                RoomCommand::Vote {
                    player_id,
                    target,
                    reply,
                } => {
                    let result = self.room.submit_vote(player_id, target);
                    let _ = reply.send(self.deliver(result));
                }
            }
        }

        tracing::info!(room_code = %code, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let out = self.room.add_player(player_id, name)?;
        self.senders.insert(player_id, sender);
        tracing::info!(
            room_code = %self.room.code(),
            %player_id,
            players = self.room.player_count(),
            "player joined"
        );
        self.dispatch(out);
        Ok(())
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<usize, RoomError> {
        let out = self.room.remove_player(player_id)?;
        self.senders.remove(&player_id);
        let remaining = self.room.player_count();
        tracing::info!(
            room_code = %self.room.code(),
            %player_id,
            players = remaining,
            "player left"
        );
        self.dispatch(out);

        if remaining == 0 {
            self.closed = true;
            tracing::debug!(room_code = %self.room.code(), "room empty, closed");
        }
        Ok(remaining)
    }

    fn handle_start(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        let mut rng = rand::rng();
        let result = self.room.start_game(player_id, &*self.words, &mut rng);
        match &result {
            Ok(_) => tracing::info!(
                room_code = %self.room.code(),
                round = self.room.round(),
                players = self.room.player_count(),
                "round started"
            ),
            Err(RoomError::NotHost(_)) => tracing::debug!(
                room_code = %self.room.code(),
                %player_id,
                "start requested by non-host"
            ),
            Err(_) => {}
        }
        self.deliver(result)
    }

    fn reject_closed(&self, cmd: RoomCommand) {
        let err = || RoomError::NotFound(self.room.code().clone());
        match cmd {
            RoomCommand::Join { reply, .. }
            | RoomCommand::Start { reply, .. }
            | RoomCommand::Hint { reply, .. }
            | RoomCommand::Vote { reply, .. } => {
                let _ = reply.send(Err(err()));
            }
            RoomCommand::Leave { reply, .. } => {
                let _ = reply.send(Err(err()));
            }
            RoomCommand::GetInfo { .. } | RoomCommand::Shutdown => {}
        }
    }

    /// Dispatches the notifications of a successful event, or logs the
    /// rejection. Either way the result goes back to the caller.
    fn deliver(&self, result: Result<Vec<Outbound>, RoomError>) -> Result<(), RoomError> {
        match result {
            Ok(out) => {
                self.dispatch(out);
                Ok(())
            }
            Err(e) => {
                tracing::debug!(room_code = %self.room.code(), error = %e, "event rejected");
                Err(e)
            }
        }
    }

    /// Dispatches outbound messages to the correct recipients.
    fn dispatch(&self, msgs: Vec<Outbound>) {
        for (recipient, msg) in msgs {
            match recipient {
                Recipient::All => {
                    for pid in self.senders.keys() {
                        self.send_to(*pid, msg.clone());
                    }
                }
                Recipient::Player(pid) => self.send_to(pid, msg),
            }
        }
    }

    /// Sends to a single player. Silently drops if the receiver is gone
    /// (the connection closed and its leave is still on the way).
    fn send_to(&self, player_id: PlayerId, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.room.code().clone(),
            phase: self.room.phase(),
            round: self.room.round(),
            host: self.room.host(),
            players: self.room.player_ids(),
            impostor: self.room.impostor(),
            word: self.room.word().map(str::to_string),
            hints: self.room.hint_count(),
            votes: self.room.vote_count(),
            last_result: self.room.last_result().cloned(),
        }
    }
}

/// Creates a room with `host` as its first member and spawns its actor.
///
/// The host's `RoomCreated` is queued on `host_sender` before this
/// returns. Fails without spawning anything if the host name is invalid.
pub(crate) fn spawn_room(
    code: RoomCode,
    config: RoomConfig,
    words: Arc<dyn WordSource>,
    host: PlayerId,
    host_name: &str,
    host_sender: PlayerSender,
) -> Result<RoomHandle, RoomError> {
    let channel_size = config.channel_size;
    let (room, out) = Room::create(code.clone(), config, host, host_name)?;
    let (tx, rx) = mpsc::channel(channel_size);

    let mut senders = HashMap::new();
    senders.insert(host, host_sender);

    let actor = RoomActor {
        room,
        senders,
        words,
        receiver: rx,
        closed: false,
    };
    actor.dispatch(out);

    tokio::spawn(actor.run());

    Ok(RoomHandle { code, sender: tx })
}

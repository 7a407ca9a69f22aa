//! Message types: what clients send, what the server sends back, and the
//! envelope both travel in.
//!
//! Both enums use `#[serde(tag = "type")]`, which produces "internally
//! tagged" JSON:
//!   `{ "type": "JoinRoom", "code": "ABC123", "name": "Mia" }`
//! rather than `{ "JoinRoom": { ... } }`. That is the shape the browser
//! client switches on.

use serde::{Deserialize, Serialize};

use crate::{Phase, PlayerId, RoomCode};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Events a connected client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// "Open a new room with me as host."
    CreateRoom { name: String },

    /// "Put me in this room." The code is parsed leniently by the server.
    JoinRoom { code: String, name: String },

    /// Host only: begin a new round.
    StartGame,

    /// "Here is my clue." A second hint replaces the first.
    SubmitHint { hint: String },

    /// "I think this player is the impostor." A second vote replaces the first.
    SubmitVote { target: PlayerId },

    /// "Take me out of my room." Closing the socket has the same effect.
    LeaveRoom,

    /// Keep-alive. The server echoes `client_time` back.
    Heartbeat { client_time: u64 },
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// One member as every other member sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
}

/// The public state of a room.
///
/// Deliberately free of the secret word and the impostor: those are only
/// sent per recipient at round start, and in the round result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub phase: Phase,
    pub round: u32,
    pub host: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    /// Players who have already handed in a hint this round.
    pub hinted: Vec<PlayerId>,
    /// Players who have already voted this round.
    pub voted: Vec<PlayerId>,
}

/// A collected hint, revealed when voting opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintEntry {
    pub player_id: PlayerId,
    pub player_name: String,
    pub hint: String,
}

/// How many votes one player received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub player_id: PlayerId,
    pub votes: usize,
}

/// Outcome of a round, produced once when the last vote is in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: u32,
    /// The most-voted player. `None` only if nobody voted at all.
    pub accused: Option<PlayerId>,
    pub impostor: PlayerId,
    pub impostor_found: bool,
    pub word: String,
    /// Tally per accused player, ordered by player id.
    pub tally: Vec<VoteCount>,
    pub players: Vec<PlayerView>,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Notifications the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// First message on every connection.
    Welcome {
        player_id: PlayerId,
        protocol_version: u32,
    },

    /// To the creator only, right after `CreateRoom`.
    RoomCreated { code: RoomCode, room: RoomSnapshot },

    /// To all members whenever membership changes.
    RoomState { room: RoomSnapshot },

    /// To each member at round start. The impostor gets `word: None`.
    GameStarted {
        room: RoomSnapshot,
        word: Option<String>,
        is_impostor: bool,
    },

    /// To all members when someone hands in a hint.
    HintSubmitted {
        player_id: PlayerId,
        player_name: String,
    },

    /// To all members once every player has hinted.
    VotingPhase {
        room: RoomSnapshot,
        hints: Vec<HintEntry>,
    },

    /// To all members once every player has voted.
    GameFinished {
        room: RoomSnapshot,
        result: RoundResult,
    },

    /// To all members when a round cannot continue (the impostor left).
    RoundAbandoned { room: RoomSnapshot, reason: String },

    /// To the sender of a rejected event only.
    /// `code` follows HTTP conventions: 400 invalid input, 404 unknown
    /// room, 409 wrong phase or missing privilege.
    Error { code: u16, message: String },

    /// Reply to `Heartbeat`.
    HeartbeatAck { client_time: u64, server_time: u64 },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level wire wrapper around a client or server message.
///
/// ```text
/// { "seq": 4, "timestamp": 15000, "message": { "type": "StartGame" } }
/// ```
///
/// `seq` counts messages per direction on one connection; `timestamp`
/// is milliseconds since the sender started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub timestamp: u64,
    pub message: T,
}

impl<T> Envelope<T> {
    /// Wraps a message with the given sequence number and timestamp.
    pub fn new(seq: u64, timestamp: u64, message: T) -> Self {
        Self {
            seq,
            timestamp,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> RoomCode {
        RoomCode::parse("ABC123").unwrap()
    }

    fn snapshot() -> RoomSnapshot {
        RoomSnapshot {
            code: code(),
            phase: Phase::Waiting,
            round: 0,
            host: Some(PlayerId(1)),
            players: vec![PlayerView {
                id: PlayerId(1),
                name: "Mia".into(),
                is_host: true,
            }],
            hinted: vec![],
            voted: vec![],
        }
    }

    #[test]
    fn test_client_join_room_json_format() {
        let json = r#"{"type":"JoinRoom","code":"abc123","name":"Mia"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinRoom {
                code: "abc123".into(),
                name: "Mia".into()
            }
        );
    }

    #[test]
    fn test_client_unit_variants_parse_from_type_only() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"StartGame"}"#).unwrap();
        assert_eq!(msg, ClientMessage::StartGame);
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"LeaveRoom"}"#).unwrap();
        assert_eq!(msg, ClientMessage::LeaveRoom);
    }

    #[test]
    fn test_client_vote_target_is_plain_number() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"SubmitVote","target":17}"#).unwrap();
        assert_eq!(msg, ClientMessage::SubmitVote { target: PlayerId(17) });
    }

    #[test]
    fn test_client_unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"RevealImpostor"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_game_started_hides_word_for_impostor() {
        let msg = ServerMessage::GameStarted {
            room: snapshot(),
            word: None,
            is_impostor: true,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "GameStarted");
        assert!(json["word"].is_null());
        assert_eq!(json["is_impostor"], true);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json: serde_json::Value = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["code"], "ABC123");
        assert_eq!(json["phase"], "waiting");
        assert_eq!(json["host"], 1);
        assert_eq!(json["players"][0]["name"], "Mia");
        assert_eq!(json["players"][0]["is_host"], true);
    }

    #[test]
    fn test_server_error_json_format() {
        let msg = ServerMessage::Error {
            code: 409,
            message: "game already started".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 409);
    }

    #[test]
    fn test_envelope_defaults_missing_seq_and_timestamp() {
        let json = r#"{"message":{"type":"Heartbeat","client_time":5}}"#;
        let env: Envelope<ClientMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(env.seq, 0);
        assert_eq!(env.timestamp, 0);
        assert_eq!(env.message, ClientMessage::Heartbeat { client_time: 5 });
    }

    #[test]
    fn test_envelope_round_trip() {
        let env = Envelope::new(3, 1200, ServerMessage::RoomState { room: snapshot() });
        let bytes = serde_json::to_vec(&env).unwrap();
        let decoded: Envelope<ServerMessage> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(env, decoded);
    }
}

//! Per-connection handler: welcome, message routing, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Assign a `PlayerId` from the connection id and send `Welcome`
//!   2. Spawn a writer task that drains the connection's outbound channel
//!   3. Loop: receive envelopes → route to the room directory
//!   4. On exit, leave whatever room the connection was in
//!
//! Rooms and the handler both write to the same outbound channel, so an
//! error reply is ordered after any broadcast its event caused.

use std::sync::Arc;

use impostor_protocol::{
    ClientMessage, Codec, Envelope, PROTOCOL_VERSION, PlayerId, ProtocolError, RoomCode,
    ServerMessage,
};
use impostor_room::{PlayerSender, RoomError};
use impostor_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ImpostorError;
use crate::server::ServerState;

/// Drop guard that takes the player out of their room when the handler
/// exits, however it exits.
///
/// Since `Drop` is synchronous, the leave runs in a fire-and-forget task.
struct LeaveGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for LeaveGuard<C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            match state.directory.leave(player_id).await {
                Ok(()) => tracing::info!(%player_id, "disconnected player left room"),
                Err(RoomError::NotInRoom(_)) => {}
                Err(e) => tracing::warn!(%player_id, error = %e, "leave on disconnect failed"),
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ImpostorError> {
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    tracing::info!(%conn_id, %player_id, "player connected");

    let conn = Arc::new(conn);
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), rx));

    let _guard = LeaveGuard {
        player_id,
        state: Arc::clone(&state),
    };

    let _ = tx.send(ServerMessage::Welcome {
        player_id,
        protocol_version: PROTOCOL_VERSION,
    });

    let result = read_loop(&conn, &state, player_id, &tx).await;

    writer.abort();
    let _ = conn.close().await;
    // _guard drops here → the leave fires.
    result
}

/// Receives and routes envelopes until the peer closes, goes idle, or
/// the socket fails.
async fn read_loop<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    player_id: PlayerId,
    tx: &PlayerSender,
) -> Result<(), ImpostorError> {
    loop {
        let data = match tokio::time::timeout(state.config.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%player_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%player_id, "connection timed out");
                return Ok(());
            }
        };

        let message = match decode(state, &data) {
            Ok(envelope) => envelope.message,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                send_error(tx, 400, e.to_string());
                continue;
            }
        };

        if let Err(e) = dispatch(state, player_id, tx, message).await {
            tracing::debug!(%player_id, error = %e, "event rejected");
            send_error(tx, e.code(), e.to_string());
        }
    }
}

fn decode<C: Codec>(
    state: &ServerState<C>,
    data: &[u8],
) -> Result<Envelope<ClientMessage>, ProtocolError> {
    if data.len() > state.config.max_message_bytes {
        return Err(ProtocolError::InvalidMessage(format!(
            "message of {} bytes exceeds the {} byte limit",
            data.len(),
            state.config.max_message_bytes
        )));
    }
    state.codec.decode(data)
}

/// Routes one client event to the room directory.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    player_id: PlayerId,
    tx: &PlayerSender,
    message: ClientMessage,
) -> Result<(), RoomError> {
    let directory = &state.directory;
    match message {
        ClientMessage::CreateRoom { name } => {
            directory.create_room(player_id, &name, tx.clone()).await?;
        }
        ClientMessage::JoinRoom { code, name } => {
            let code = RoomCode::parse(&code)
                .ok_or_else(|| RoomError::Validation(format!("invalid room code {code:?}")))?;
            directory
                .join_room(&code, player_id, &name, tx.clone())
                .await?;
        }
        ClientMessage::StartGame => directory.start_game(player_id).await?,
        ClientMessage::SubmitHint { hint } => directory.submit_hint(player_id, &hint).await?,
        ClientMessage::SubmitVote { target } => directory.submit_vote(player_id, target).await?,
        ClientMessage::LeaveRoom => directory.leave(player_id).await?,
        ClientMessage::Heartbeat { client_time } => {
            let _ = tx.send(ServerMessage::HeartbeatAck {
                client_time,
                server_time: state.uptime_ms(),
            });
        }
    }
    Ok(())
}

/// Drains the outbound channel onto the socket, wrapping each message
/// in an envelope with the next sequence number.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    let conn_id = conn.id();
    let mut seq: u64 = 1;

    while let Some(message) = rx.recv().await {
        let envelope = Envelope::new(next_seq(&mut seq), state.uptime_ms(), message);
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Queues an error for the connection that caused it.
fn send_error(tx: &PlayerSender, code: u16, message: String) {
    let _ = tx.send(ServerMessage::Error { code, message });
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_seq_counts_up_from_current() {
        let mut seq = 1;
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(next_seq(&mut seq), 2);
        assert_eq!(seq, 3);
    }

    #[test]
    fn test_send_error_queues_error_message() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_error(&tx, 404, "room XYZ999 not found".into());
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::Error {
                code: 404,
                message: "room XYZ999 not found".into(),
            }
        );
    }
}

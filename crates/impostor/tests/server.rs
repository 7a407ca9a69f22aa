//! Integration tests for the impostor server: real WebSocket clients
//! talking to a server bound on a random port.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use impostor::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

const WORD: &str = "Leuchtturm";

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn start_with(builder: ImpostorServerBuilder) -> String {
    let server = builder
        .bind("127.0.0.1:0")
        .words(WordList::new([WORD]).expect("non-empty list"))
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn start_server() -> String {
    start_with(ImpostorServer::builder()).await
}

/// Connects and consumes the `Welcome`, returning the assigned id.
async fn connect(addr: &str) -> (ClientWs, PlayerId) {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    match recv(&mut ws).await.message {
        ServerMessage::Welcome {
            player_id,
            protocol_version,
        } => {
            assert_eq!(protocol_version, PROTOCOL_VERSION);
            (ws, player_id)
        }
        other => panic!("expected Welcome, got {other:?}"),
    }
}

async fn send(ws: &mut ClientWs, message: ClientMessage) {
    let envelope = Envelope::new(0, 0, message);
    let json = serde_json::to_string(&envelope).expect("encode");
    ws.send(Message::Text(json.into())).await.expect("send");
}

/// Next server envelope, skipping control frames.
async fn recv(ws: &mut ClientWs) -> Envelope<ServerMessage> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        match frame {
            Message::Text(_) | Message::Binary(_) => {
                return serde_json::from_slice(&frame.into_data()).expect("decode");
            }
            _ => continue,
        }
    }
}

/// Skips messages until one matches.
async fn recv_until(
    ws: &mut ClientWs,
    pred: impl Fn(&ServerMessage) -> bool,
) -> ServerMessage {
    loop {
        let message = recv(ws).await.message;
        if pred(&message) {
            return message;
        }
    }
}

async fn create_room(ws: &mut ClientWs, name: &str) -> RoomCode {
    send(ws, ClientMessage::CreateRoom { name: name.into() }).await;
    match recv_until(ws, |m| matches!(m, ServerMessage::RoomCreated { .. })).await {
        ServerMessage::RoomCreated { code, .. } => code,
        _ => unreachable!(),
    }
}

async fn join_room(ws: &mut ClientWs, code: &str, name: &str) {
    send(
        ws,
        ClientMessage::JoinRoom {
            code: code.into(),
            name: name.into(),
        },
    )
    .await;
}

fn error_code(message: &ServerMessage) -> Option<u16> {
    match message {
        ServerMessage::Error { code, .. } => Some(*code),
        _ => None,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_welcome_assigns_distinct_ids() {
    let addr = start_server().await;
    let (_a, id_a) = connect(&addr).await;
    let (_b, id_b) = connect(&addr).await;
    assert_ne!(id_a, id_b);
}

#[tokio::test]
async fn test_create_room_returns_code() {
    let addr = start_server().await;
    let (mut ws, id) = connect(&addr).await;

    send(&mut ws, ClientMessage::CreateRoom { name: "Mia".into() }).await;
    match recv(&mut ws).await.message {
        ServerMessage::RoomCreated { code, room } => {
            assert_eq!(code.as_str().len(), 6);
            assert_eq!(room.host, Some(id));
            assert_eq!(room.phase, Phase::Waiting);
            assert_eq!(room.players.len(), 1);
        }
        other => panic!("expected RoomCreated, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_envelopes_are_sequenced() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    send(&mut ws, ClientMessage::Heartbeat { client_time: 1 }).await;
    send(&mut ws, ClientMessage::Heartbeat { client_time: 2 }).await;
    let first = recv(&mut ws).await;
    let second = recv(&mut ws).await;
    // Welcome took seq 1.
    assert_eq!(first.seq, 2);
    assert_eq!(second.seq, 3);
}

#[tokio::test]
async fn test_heartbeat_echoes_client_time() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    send(&mut ws, ClientMessage::Heartbeat { client_time: 12345 }).await;
    match recv(&mut ws).await.message {
        ServerMessage::HeartbeatAck { client_time, .. } => assert_eq!(client_time, 12345),
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_garbage_gets_400_and_connection_survives() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    ws.send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();
    assert_eq!(error_code(&recv(&mut ws).await.message), Some(400));

    ws.send(Message::Text(r#"{"message":{"type":"Dance"}}"#.to_string().into()))
        .await
        .unwrap();
    assert_eq!(error_code(&recv(&mut ws).await.message), Some(400));

    send(&mut ws, ClientMessage::Heartbeat { client_time: 7 }).await;
    assert!(matches!(
        recv(&mut ws).await.message,
        ServerMessage::HeartbeatAck { client_time: 7, .. }
    ));
}

#[tokio::test]
async fn test_oversized_message_rejected() {
    let addr = start_with(ImpostorServer::builder().max_message_bytes(64)).await;
    let (mut ws, _) = connect(&addr).await;

    send(
        &mut ws,
        ClientMessage::CreateRoom {
            name: "x".repeat(200),
        },
    )
    .await;
    assert_eq!(error_code(&recv(&mut ws).await.message), Some(400));
}

#[tokio::test]
async fn test_join_unknown_room_is_404() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    join_room(&mut ws, "ZZZZZZ", "Mia").await;
    assert_eq!(error_code(&recv(&mut ws).await.message), Some(404));
}

#[tokio::test]
async fn test_event_outside_room_is_404() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    send(&mut ws, ClientMessage::StartGame).await;
    assert_eq!(error_code(&recv(&mut ws).await.message), Some(404));
}

#[tokio::test]
async fn test_start_with_two_players_is_409() {
    let addr = start_server().await;
    let (mut host, _) = connect(&addr).await;
    let (mut guest, _) = connect(&addr).await;

    let code = create_room(&mut host, "Host").await;
    join_room(&mut guest, code.as_str(), "Guest").await;
    recv_until(&mut host, |m| {
        matches!(m, ServerMessage::RoomState { room } if room.players.len() == 2)
    })
    .await;

    send(&mut host, ClientMessage::StartGame).await;
    assert_eq!(error_code(&recv(&mut host).await.message), Some(409));
}

#[tokio::test]
async fn test_full_round_over_websocket() {
    let addr = start_server().await;
    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(connect(&addr).await);
    }

    let code = create_room(&mut clients[0].0, "Host").await;
    // Codes are case-insensitive on the way in.
    let lower = code.as_str().to_lowercase();
    join_room(&mut clients[1].0, &lower, "Ben").await;
    join_room(&mut clients[2].0, &lower, "Cleo").await;
    recv_until(&mut clients[0].0, |m| {
        matches!(m, ServerMessage::RoomState { room } if room.players.len() == 3)
    })
    .await;

    send(&mut clients[0].0, ClientMessage::StartGame).await;

    let mut impostor = None;
    for (ws, id) in clients.iter_mut() {
        match recv_until(ws, |m| matches!(m, ServerMessage::GameStarted { .. })).await {
            ServerMessage::GameStarted {
                room,
                word,
                is_impostor,
            } => {
                assert_eq!(room.phase, Phase::Hinting);
                assert_eq!(room.round, 1);
                if is_impostor {
                    assert_eq!(word, None);
                    assert!(impostor.replace(*id).is_none(), "exactly one impostor");
                } else {
                    assert_eq!(word.as_deref(), Some(WORD));
                }
            }
            _ => unreachable!(),
        }
    }
    let impostor = impostor.expect("one player is the impostor");

    for (ws, _) in clients.iter_mut() {
        send(ws, ClientMessage::SubmitHint { hint: "Meer".into() }).await;
    }
    for (ws, _) in clients.iter_mut() {
        match recv_until(ws, |m| matches!(m, ServerMessage::VotingPhase { .. })).await {
            ServerMessage::VotingPhase { room, hints } => {
                assert_eq!(room.phase, Phase::Voting);
                assert_eq!(hints.len(), 3);
            }
            _ => unreachable!(),
        }
    }

    for (ws, _) in clients.iter_mut() {
        send(ws, ClientMessage::SubmitVote { target: impostor }).await;
    }
    for (ws, _) in clients.iter_mut() {
        match recv_until(ws, |m| matches!(m, ServerMessage::GameFinished { .. })).await {
            ServerMessage::GameFinished { room, result } => {
                assert_eq!(room.phase, Phase::Finished);
                assert_eq!(result.accused, Some(impostor));
                assert_eq!(result.impostor, impostor);
                assert!(result.impostor_found);
                assert_eq!(result.word, WORD);
            }
            _ => unreachable!(),
        }
    }
}

#[tokio::test]
async fn test_disconnect_counts_as_leave() {
    let addr = start_server().await;
    let (mut host, _) = connect(&addr).await;
    let (mut guest, _) = connect(&addr).await;

    let code = create_room(&mut host, "Host").await;
    join_room(&mut guest, code.as_str(), "Guest").await;
    recv_until(&mut host, |m| {
        matches!(m, ServerMessage::RoomState { room } if room.players.len() == 2)
    })
    .await;

    guest.close(None).await.unwrap();
    drop(guest);

    recv_until(&mut host, |m| {
        matches!(m, ServerMessage::RoomState { room } if room.players.len() == 1)
    })
    .await;
}

#[tokio::test]
async fn test_leave_then_join_other_room() {
    let addr = start_server().await;
    let (mut a, _) = connect(&addr).await;
    let (mut b, _) = connect(&addr).await;

    let first = create_room(&mut a, "A").await;
    let second = create_room(&mut b, "B").await;

    // Still in the first room.
    join_room(&mut a, second.as_str(), "A").await;
    assert_eq!(error_code(&recv(&mut a).await.message), Some(409));

    send(&mut a, ClientMessage::LeaveRoom).await;
    join_room(&mut a, second.as_str(), "A").await;
    match recv(&mut a).await.message {
        ServerMessage::RoomState { room } => {
            assert_eq!(room.code, second);
            assert_eq!(room.players.len(), 2);
        }
        other => panic!("expected RoomState, got {other:?}"),
    }

    // The first room emptied out and is gone.
    let (mut c, _) = connect(&addr).await;
    join_room(&mut c, first.as_str(), "C").await;
    assert_eq!(error_code(&recv(&mut c).await.message), Some(404));
}

#[tokio::test]
async fn test_idle_connection_is_dropped() {
    let addr = start_with(ImpostorServer::builder().idle_timeout(Duration::from_millis(200))).await;
    let (mut ws, _) = connect(&addr).await;

    let end = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(end.is_ok(), "server should close an idle connection");
}

#[tokio::test]
async fn test_builder_applies_room_config() {
    let server = ImpostorServer::builder()
        .bind("127.0.0.1:0")
        .room_config(RoomConfig {
            min_players: 1,
            code_length: 8,
            ..RoomConfig::default()
        })
        .build()
        .await
        .expect("server should build");

    let config = server.directory().config();
    // Clamped up to the floor.
    assert_eq!(config.min_players, 3);
    assert_eq!(config.code_length, 8);
    assert_eq!(server.directory().room_count().await, 0);
}

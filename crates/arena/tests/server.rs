//! Integration tests for the relay server, handler, and full connection flow.

use std::sync::Arc;
use std::time::Duration;

use arena::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a relay on a random port and returns its address and registry.
async fn start_server() -> (String, Arc<RoomRegistry>) {
    let server = RelayServer::builder()
        .bind("127.0.0.1:0")
        .path("/ws")
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().to_string();
    let registry = Arc::clone(server.registry());

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, registry)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, frame: Value) {
    ws.send(Message::text(frame.to_string()))
        .await
        .expect("send");
}

/// Receives the next frame as JSON, failing after two seconds.
async fn recv(ws: &mut ClientWs) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended")
        .expect("recv");
    serde_json::from_slice(&msg.into_data()).expect("frame should be JSON")
}

/// Asserts that nothing arrives within a short window.
async fn assert_silent(ws: &mut ClientWs) {
    let result = tokio::time::timeout(Duration::from_millis(150), ws.next()).await;
    assert!(result.is_err(), "unexpected frame: {result:?}");
}

async fn request(ws: &mut ClientWs, kind: &str, data: Value) -> Value {
    send(ws, json!({ "type": kind, "data": data })).await;
    recv(ws).await
}

/// Creates a room as `owner` and returns its code.
async fn create_room(owner: &mut ClientWs, max: i64, need: i64) -> String {
    let ack = request(
        owner,
        "create_room",
        json!({ "max_players": max, "need_players": need }),
    )
    .await;
    assert_eq!(ack, json!({ "type": "create_room", "data": null }));

    let info = request(owner, "update_room_info", Value::Null).await;
    assert_eq!(info["type"], "update_room_info");
    info["data"]["id"].as_str().expect("room code").to_string()
}

async fn player_id(ws: &mut ClientWs) -> String {
    let reply = request(ws, "update_player_info", Value::Null).await;
    reply["data"]["id"].as_str().expect("player id").to_string()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_update_player_info_returns_default_identity() {
    let (addr, _) = start_server().await;
    let mut ws = connect(&addr).await;

    let reply = request(&mut ws, "update_player_info", Value::Null).await;
    assert_eq!(reply["type"], "update_player_info");
    assert_eq!(reply["data"]["name"], "Player");
    assert_eq!(reply["data"]["id"].as_str().map(str::len), Some(36));
}

#[tokio::test]
async fn test_create_room_reports_code_and_status() {
    let (addr, registry) = start_server().await;
    let mut ws = connect(&addr).await;

    let code = create_room(&mut ws, 2, 2).await;
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(registry.room_count(), 1);

    let info = request(&mut ws, "update_room_info", Value::Null).await;
    assert_eq!(info["data"]["status"], "Waiting");
    assert_eq!(info["data"]["players_count"], 1);
    assert_eq!(info["data"]["max_players"], 2);
    assert_eq!(info["data"]["need_players"], 2);
}

#[tokio::test]
async fn test_create_room_invalid_settings_returns_error() {
    let (addr, registry) = start_server().await;
    let mut ws = connect(&addr).await;

    let reply = request(&mut ws, "create_room", json!({ "max_players": 0 })).await;
    assert_eq!(reply, json!({ "type": "error", "data": "invalid max players count" }));
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test]
async fn test_full_match_flow() {
    let (addr, _) = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    let code = create_room(&mut a, 2, 2).await;
    let a_id = player_id(&mut a).await;
    let renamed = request(&mut b, "update_player_info", json!({ "name": "Ken" })).await;
    let b_id = renamed["data"]["id"].as_str().unwrap().to_string();

    // B joins: ack to B, player_join to A.
    let ack = request(&mut b, "join_room", json!(code)).await;
    assert_eq!(ack, json!({ "type": "join_room", "data": null }));
    assert_eq!(recv(&mut a).await, json!({ "type": "player_join", "data": "Ken" }));

    let info = request(&mut a, "update_room_info", Value::Null).await;
    assert_eq!(info["data"]["status"], "Ready");

    // A starts: both see the same two fighters.
    send(&mut a, json!({ "type": "start_game", "data": null })).await;
    let start_a = recv(&mut a).await;
    let start_b = recv(&mut b).await;
    assert_eq!(start_a, start_b);
    assert_eq!(start_a["type"], "start_game");
    let fighters = start_a["data"].as_array().unwrap();
    assert_eq!(fighters.len(), 2);
    assert_eq!(fighters[0]["id"], a_id.as_str());
    assert_eq!(fighters[0]["collider"]["pos"], json!({ "x": 100.0, "y": 300.0 }));
    assert_eq!(fighters[1]["id"], b_id.as_str());
    assert_eq!(fighters[1]["collider"]["pos"], json!({ "x": 500.0, "y": 300.0 }));
    assert_eq!(fighters[1]["collider"]["size"], json!({ "x": 60.0, "y": 40.0 }));

    // B relays state: A gets it verbatim, B gets nothing back.
    let state = json!({ "pos": { "x": 480.5, "y": 300 }, "hp": 75, "keys": ["left"] });
    send(&mut b, json!({ "type": "game_state", "data": state.clone() })).await;
    assert_eq!(recv(&mut a).await, json!({ "type": "game_state", "data": state }));
    assert_silent(&mut b).await;

    // A third client cannot join mid-match.
    let mut x = connect(&addr).await;
    let refused = request(&mut x, "join_room", json!(code)).await;
    assert_eq!(
        refused,
        json!({ "type": "error", "data": "there is a game going on in the room now" })
    );

    // A ends the match.
    send(&mut a, json!({ "type": "end_game", "data": null })).await;
    assert_eq!(recv(&mut a).await, json!({ "type": "end_game", "data": null }));
    assert_eq!(recv(&mut b).await, json!({ "type": "end_game", "data": null }));
}

#[tokio::test]
async fn test_owner_disconnect_closes_room() {
    let (addr, registry) = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    let code = create_room(&mut a, 2, 2).await;
    request(&mut b, "join_room", json!(code)).await;
    recv(&mut a).await; // player_join

    a.close(None).await.expect("close");

    assert_eq!(recv(&mut b).await, json!({ "type": "end_game", "data": null }));
    assert_eq!(
        recv(&mut b).await,
        json!({ "type": "room_closed", "data": "the owner has closed the room" })
    );
    assert_eq!(registry.room_count(), 0);

    let reply = request(&mut b, "update_room_info", Value::Null).await;
    assert_eq!(reply, json!({ "type": "error", "data": "player is not in any room" }));
}

#[tokio::test]
async fn test_guest_disconnect_mid_game_ends_game_and_leaves() {
    let (addr, registry) = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    let code = create_room(&mut a, 2, 2).await;
    let b_id = player_id(&mut b).await;
    request(&mut b, "join_room", json!(code)).await;
    recv(&mut a).await; // player_join
    send(&mut a, json!({ "type": "start_game", "data": null })).await;
    recv(&mut a).await; // start_game
    recv(&mut b).await;

    drop(b);

    assert_eq!(recv(&mut a).await, json!({ "type": "end_game", "data": null }));
    assert_eq!(recv(&mut a).await, json!({ "type": "player_left", "data": b_id }));
    let info = request(&mut a, "update_room_info", Value::Null).await;
    assert_eq!(info["data"]["status"], "Waiting");
    assert_eq!(info["data"]["players_count"], 1);
    assert_eq!(registry.room_count(), 1);
}

#[tokio::test]
async fn test_invalid_envelope_ignored() {
    let (addr, _) = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("not json".to_string())).await.expect("send");
    send(&mut ws, json!({ "data": "no type" })).await;
    send(&mut ws, json!({ "type": "join_room", "data": 123456 })).await;

    // The connection survives and still answers.
    let reply = request(&mut ws, "update_player_info", Value::Null).await;
    assert_eq!(reply["type"], "update_player_info");
}

#[tokio::test]
async fn test_update_player_info_with_odd_data_still_replies() {
    let (addr, _) = start_server().await;
    let mut ws = connect(&addr).await;

    for data in [json!("hello"), json!(7)] {
        let reply = request(&mut ws, "update_player_info", data).await;
        assert_eq!(reply["type"], "update_player_info");
        assert_eq!(reply["data"]["name"], "Player");
    }
}

#[tokio::test]
async fn test_unknown_message_type_returns_error() {
    let (addr, _) = start_server().await;
    let mut ws = connect(&addr).await;

    let reply = request(&mut ws, "fly_to_moon", Value::Null).await;
    assert_eq!(reply, json!({ "type": "error", "data": "unknown message type" }));

    let reply = request(&mut ws, "room_closed", json!("x")).await;
    assert_eq!(reply, json!({ "type": "error", "data": "unknown message type" }));
}

#[tokio::test]
async fn test_wrong_path_is_rejected() {
    let (addr, _) = start_server().await;
    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/other")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_bind_failure_reports_error() {
    let (addr, _) = start_server().await;
    let result = RelayServer::builder().bind(&addr).build().await;
    assert!(matches!(result, Err(RelayError::Transport(_))));
}

#[tokio::test]
async fn test_multiple_rooms_are_independent() {
    let (addr, registry) = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let mut c = connect(&addr).await;
    let mut d = connect(&addr).await;

    let first = create_room(&mut a, 2, 2).await;
    let second = create_room(&mut c, 2, 2).await;
    assert_ne!(first, second);
    request(&mut b, "join_room", json!(first)).await;
    request(&mut d, "join_room", json!(second)).await;
    recv(&mut a).await;
    recv(&mut c).await;

    send(&mut b, json!({ "type": "game_state", "data": { "room": 1 } })).await;
    assert_eq!(recv(&mut a).await["data"], json!({ "room": 1 }));
    assert_silent(&mut c).await;
    assert_silent(&mut d).await;
    assert_eq!(registry.room_count(), 2);
}

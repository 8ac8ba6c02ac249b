//! End-to-end `WebSocket` tests against a relay bound to an ephemeral port.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ais_relay_server::{AppState, BroadcastHub, ShipRegistry, serve};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_test_server() -> (SocketAddr, Arc<BroadcastHub>) {
    let hub = Arc::new(BroadcastHub::new(Arc::new(ShipRegistry::new())));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(Arc::clone(&hub));
    tokio::spawn(async move {
        serve(listener, state, std::future::pending()).await.unwrap();
    });
    (addr, hub)
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("WebSocket handshake failed");
    client
}

async fn send_json(client: &mut Client, value: &Value) {
    client.send(Message::text(value.to_string())).await.unwrap();
}

async fn next_event(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn assert_silent(client: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(result.is_err(), "unexpected frame: {result:?}");
}

async fn viewer(addr: SocketAddr) -> (Client, Value) {
    let mut client = connect(addr, "/ws").await;
    send_json(&mut client, &json!({"type": "identify", "clientType": "viewer"})).await;
    let initial = next_event(&mut client).await;
    assert_eq!(initial["type"], "initial_data");
    (client, initial)
}

async fn sender(addr: SocketAddr) -> Client {
    let mut client = connect(addr, "/").await;
    send_json(&mut client, &json!({"type": "identify", "clientType": "sender"})).await;
    client
}

fn position_report(mmsi: &str) -> Value {
    json!({
        "type": "ais_data",
        "decoded": {
            "mmsi": mmsi,
            "type": 1,
            "lat": 51.95,
            "lon": 4.05,
            "sog": 11.2,
            "cog": 270.0,
            "trueHeading": 268,
            "status": 0
        }
    })
}

#[tokio::test]
async fn sender_update_reaches_viewer() {
    let (addr, _hub) = start_test_server().await;
    let (mut watcher, initial) = viewer(addr).await;
    assert_eq!(initial["count"], 0);

    let mut feed = sender(addr).await;
    send_json(&mut feed, &position_report("244123456")).await;

    let update = next_event(&mut watcher).await;
    assert_eq!(update["type"], "ship_update");
    assert_eq!(update["ship"]["mmsi"], "244123456");
    assert_eq!(update["ship"]["speed"], 11.2);
    assert_eq!(update["ship"]["heading"], 268.0);
    assert_eq!(update["ship"]["navStatus"], 0);
    assert!(update["ship"]["lastUpdate"].is_string());

    assert_silent(&mut feed).await;
}

#[tokio::test]
async fn late_viewer_gets_existing_ships() {
    let (addr, _hub) = start_test_server().await;
    let (mut early, _) = viewer(addr).await;

    let mut feed = sender(addr).await;
    send_json(&mut feed, &position_report("111000111")).await;
    send_json(&mut feed, &position_report("222000222")).await;
    next_event(&mut early).await;
    next_event(&mut early).await;

    let (_late, initial) = viewer(addr).await;
    assert_eq!(initial["count"], 2);
    assert_eq!(initial["ships"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn get_all_ships_is_answered_for_viewers_only() {
    let (addr, _hub) = start_test_server().await;
    let (mut watcher, _) = viewer(addr).await;
    let mut feed = sender(addr).await;
    send_json(&mut feed, &position_report("333000333")).await;
    next_event(&mut watcher).await;

    send_json(&mut feed, &json!({"type": "get_all_ships"})).await;
    assert_silent(&mut feed).await;

    send_json(&mut watcher, &json!({"type": "get_all_ships"})).await;
    let reply = next_event(&mut watcher).await;
    assert_eq!(reply["type"], "all_ships");
    assert_eq!(reply["count"], 1);
}

#[tokio::test]
async fn malformed_frame_keeps_connection_open() {
    let (addr, _hub) = start_test_server().await;
    let (mut watcher, _) = viewer(addr).await;

    watcher.send(Message::text("{definitely not json")).await.unwrap();
    send_json(&mut watcher, &json!({"type": "bogus"})).await;
    assert_silent(&mut watcher).await;

    send_json(&mut watcher, &json!({"type": "get_all_ships"})).await;
    assert_eq!(next_event(&mut watcher).await["type"], "all_ships");
}

#[tokio::test]
async fn closed_connection_is_unregistered() {
    let (addr, hub) = start_test_server().await;
    let (mut watcher, _) = viewer(addr).await;
    assert_eq!(hub.stats().await.viewers, 1);

    watcher.close(None).await.unwrap();

    let mut viewers = 1;
    for _ in 0..50 {
        viewers = hub.stats().await.viewers;
        if viewers == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(viewers, 0);
    assert_eq!(hub.stats().await.clients, 0);
}

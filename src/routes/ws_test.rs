use super::*;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::state::test_helpers::{spawn_app, test_app_state};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: std::net::SocketAddr, client_id: &str) -> Client {
    let (stream, _) = connect_async(format!("ws://{addr}/ws/chat/{client_id}")).await.expect("ws connect");
    stream
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let msg = timeout(Duration::from_millis(500), client.next())
            .await
            .expect("ws receive timed out")
            .expect("ws stream ended")
            .expect("ws error");
        if let WsMessage::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

async fn wait_for_clients(state: &AppState, count: usize) {
    for _ in 0..50 {
        if state.connections.count().await == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} registered clients");
}

#[test]
fn relay_texts() {
    assert_eq!(echo_text("hi"), "Echo: hi");
    assert_eq!(broadcast_text("alice", "hi"), "Broadcast: alice says hi");
    assert_eq!(disconnect_text("alice"), "Client alice disconnected");
}

#[tokio::test]
async fn message_is_echoed_then_broadcast() {
    let state = test_app_state();
    let addr = spawn_app(state.clone()).await;
    let mut alice = connect(addr, "alice").await;
    let mut bob = connect(addr, "bob").await;
    wait_for_clients(&state, 2).await;

    alice.send(WsMessage::text("  hello  ")).await.unwrap();

    assert_eq!(next_text(&mut alice).await, "Echo: hello");
    assert_eq!(next_text(&mut alice).await, "Broadcast: alice says hello");
    assert_eq!(next_text(&mut bob).await, "Broadcast: alice says hello");
}

#[tokio::test]
async fn blank_messages_are_ignored() {
    let state = test_app_state();
    let addr = spawn_app(state.clone()).await;
    let mut alice = connect(addr, "alice").await;
    wait_for_clients(&state, 1).await;

    alice.send(WsMessage::text("   ")).await.unwrap();
    alice.send(WsMessage::text("ping")).await.unwrap();
    assert_eq!(next_text(&mut alice).await, "Echo: ping");
}

#[tokio::test]
async fn disconnect_is_announced() {
    let state = test_app_state();
    let addr = spawn_app(state.clone()).await;
    let mut alice = connect(addr, "alice").await;
    let mut bob = connect(addr, "bob").await;
    wait_for_clients(&state, 2).await;

    alice.close(None).await.unwrap();
    assert_eq!(next_text(&mut bob).await, "Client alice disconnected");
    wait_for_clients(&state, 1).await;
}

#[tokio::test]
async fn invalid_token_is_refused() {
    let addr = spawn_app(test_app_state()).await;
    let result = connect_async(format!("ws://{addr}/ws/chat/alice?token=garbage")).await;
    assert!(result.is_err());
}

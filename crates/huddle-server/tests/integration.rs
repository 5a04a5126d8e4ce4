//! End-to-end tests using real WebSocket clients.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use huddle_server::{HuddleServer, ServerConfig};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Boot a server on an ephemeral port and return its WS URL.
async fn boot_server(config: ServerConfig) -> (String, HuddleServer) {
    let server = HuddleServer::new(config, None);
    let (addr, _handle) = server.listen().await.unwrap();
    (format!("ws://{addr}/ws"), server)
}

async fn connect(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

/// Wait until the server has registered `n` open sockets.
async fn wait_for_peers(server: &HuddleServer, n: usize) {
    timeout(TIMEOUT, async {
        while server.peers().len().await != n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timeout waiting for peer count");
}

/// Read the next text message as JSON.
async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Assert nothing arrives for a short while.
async fn assert_silent(ws: &mut WsStream) {
    let next = timeout(Duration::from_millis(200), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(_)) => {}
                _ => return None,
            }
        }
    })
    .await;
    if let Ok(Some(text)) = next {
        panic!("unexpected message: {text}");
    }
}

async fn send(ws: &mut WsStream, frame: Value) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Connect and register under `name`, consuming the caller's own roster
/// update and joined notice.
async fn join(url: &str, name: &str) -> WsStream {
    let mut ws = connect(url).await;
    send(&mut ws, json!({"action": "setName", "name": name})).await;
    let roster = read_json(&mut ws).await;
    assert!(roster["members"].is_array());
    assert_eq!(
        read_json(&mut ws).await,
        json!({"systemMessage": format!("{name} has joined the chat")})
    );
    ws
}

#[tokio::test]
async fn e2e_join_announces_to_everyone() {
    let (url, server) = boot_server(ServerConfig::default()).await;
    let mut alice = join(&url, "alice").await;
    let mut bob = connect(&url).await;
    send(&mut bob, json!({"action": "setName", "name": "bob"})).await;

    for ws in [&mut alice, &mut bob] {
        assert_eq!(read_json(ws).await, json!({"members": ["alice", "bob"]}));
        assert_eq!(
            read_json(ws).await,
            json!({"systemMessage": "bob has joined the chat"})
        );
    }
    assert_eq!(server.registry().len(), 2);
}

#[tokio::test]
async fn e2e_public_message() {
    let (url, _server) = boot_server(ServerConfig::default()).await;
    let mut alice = join(&url, "alice").await;
    let mut bob = join(&url, "bob").await;
    let _ = read_json(&mut alice).await; // roster with bob
    let _ = read_json(&mut alice).await; // bob joined

    send(&mut alice, json!({"action": "sendPublic", "message": "hello"})).await;
    for ws in [&mut alice, &mut bob] {
        assert_eq!(read_json(ws).await, json!({"publicMessage": "alice: hello"}));
    }
}

#[tokio::test]
async fn e2e_private_message_reaches_only_recipient() {
    let (url, _server) = boot_server(ServerConfig::default()).await;
    let mut alice = join(&url, "alice").await;
    let mut bob = join(&url, "bob").await;
    let mut carol = join(&url, "carol").await;
    for _ in 0..4 {
        let _ = read_json(&mut alice).await;
    }
    for _ in 0..2 {
        let _ = read_json(&mut bob).await;
    }

    send(&mut alice, json!({"action": "sendPrivate", "to": "bob", "message": "psst"})).await;
    assert_eq!(read_json(&mut bob).await, json!({"privateMessage": "alice: psst"}));
    assert_silent(&mut alice).await;
    assert_silent(&mut carol).await;
}

#[tokio::test]
async fn e2e_unknown_action_echoes_404() {
    let (url, server) = boot_server(ServerConfig::default()).await;
    let mut ws = connect(&url).await;
    send(&mut ws, json!({"action": "pingpong"})).await;
    assert_eq!(
        read_json(&mut ws).await,
        json!({"statusCode": 404, "body": "Route not found"})
    );
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn e2e_frame_without_action_echoes_404() {
    let (url, _server) = boot_server(ServerConfig::default()).await;
    let mut ws = connect(&url).await;
    send(&mut ws, json!({"message": "hi"})).await;
    assert_eq!(read_json(&mut ws).await["statusCode"], 404);
}

#[tokio::test]
async fn e2e_invalid_json_echoes_400() {
    let (url, server) = boot_server(ServerConfig::default()).await;
    let mut ws = connect(&url).await;
    ws.send(Message::Text("{not json".into())).await.unwrap();
    assert_eq!(
        read_json(&mut ws).await,
        json!({"statusCode": 400, "body": "Bad request: Error parsing JSON"})
    );
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn e2e_empty_frame_echoes_404() {
    let (url, server) = boot_server(ServerConfig::default()).await;
    let mut ws = connect(&url).await;
    ws.send(Message::Text("".into())).await.unwrap();
    assert_eq!(
        read_json(&mut ws).await,
        json!({"statusCode": 404, "body": "Route not found"})
    );
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn e2e_disconnect_announces_departure() {
    let (url, server) = boot_server(ServerConfig::default()).await;
    let mut alice = join(&url, "alice").await;
    let mut bob = join(&url, "bob").await;
    let _ = read_json(&mut alice).await;
    let _ = read_json(&mut alice).await;

    alice.close(None).await.unwrap();
    assert_eq!(
        read_json(&mut bob).await,
        json!({"systemMessage": "alice has left the chat"})
    );
    assert_eq!(read_json(&mut bob).await, json!({"members": ["bob"]}));

    wait_for_peers(&server, 1).await;
    assert_eq!(server.registry().len(), 1);
}

#[tokio::test]
async fn e2e_dropped_socket_is_cleaned_up() {
    let (url, server) = boot_server(ServerConfig::default()).await;
    let alice = join(&url, "alice").await;
    wait_for_peers(&server, 1).await;
    drop(alice);
    wait_for_peers(&server, 0).await;
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn e2e_connection_limit_refuses_with_503() {
    let config = ServerConfig {
        max_connections: 1,
        ..ServerConfig::default()
    };
    let (url, server) = boot_server(config).await;
    let _first = connect(&url).await;
    wait_for_peers(&server, 1).await;

    match connect_async(&url).await {
        Err(tungstenite::Error::Http(resp)) => assert_eq!(resp.status(), 503),
        other => panic!("expected 503, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn e2e_unresponsive_client_is_closed() {
    let config = ServerConfig {
        heartbeat_interval_secs: 1,
        heartbeat_timeout_secs: 1,
        ..ServerConfig::default()
    };
    let (url, server) = boot_server(config).await;
    // never polled, so pings go unanswered
    let _silent = connect(&url).await;
    wait_for_peers(&server, 1).await;
    timeout(Duration::from_secs(10), async {
        while server.peers().len().await != 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("idle socket was not closed");
}

#[tokio::test]
async fn e2e_shutdown_closes_sessions() {
    let (url, server) = boot_server(ServerConfig::default()).await;
    let mut ws = join(&url, "alice").await;
    server.shutdown().shutdown();

    let ended = timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_)) | Err(_)) | None => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "session did not close on shutdown");
    wait_for_peers(&server, 0).await;
}

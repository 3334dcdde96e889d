//! WebSocket integration tests
//!
//! These tests start an actual server on a loopback port and talk to it
//! with a tokio-tungstenite client.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tickerhub_server::{
    FixedClock, HubHandle, Instrument, ServerConfig, ShutdownTrigger, TickerHub, shutdown_channel,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Test Fixtures
// ============================================================================

struct TestServer {
    addr: SocketAddr,
    hub: HubHandle,
    trigger: ShutdownTrigger,
    task: JoinHandle<std::io::Result<()>>,
}

/// Start a server with the simulated feed ticking every `interval_ms`
async fn start_test_server(interval_ms: u64) -> TestServer {
    let mut config = ServerConfig::default();
    config.simulation.interval_ms = interval_ms;
    config.simulation.rng_seed = Some(7);

    start_server(config).await
}

async fn start_server(config: ServerConfig) -> TestServer {
    let server = TickerHub::with_clock(config, Arc::new(FixedClock::epoch()));
    let hub = server.hub_handle();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (trigger, shutdown) = shutdown_channel();

    let task = tokio::spawn(server.serve(listener, shutdown));

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        hub,
        trigger,
        task,
    }
}

/// Server whose feed stays quiet for the duration of a test
async fn start_quiet_server() -> TestServer {
    start_test_server(600_000).await
}

async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{}/ws", addr);
    let (ws_stream, _response) = connect_async(&url).await.expect("Failed to connect");
    ws_stream
}

async fn wait_for_subscribers(hub: &HubHandle, expected: usize) {
    for _ in 0..200 {
        if hub.subscriber_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} subscribers, hub reports {}",
        expected,
        hub.subscriber_count()
    );
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream closed")
            .expect("Message error");

        match msg {
            Message::Text(text) => return text.as_str().to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Expected text message, got {:?}", other),
        }
    }
}

fn snapshot() -> Vec<Instrument> {
    vec![Instrument::new("AAPL", 150.0), Instrument::new("TSLA", 700.0)]
}

// ============================================================================
// Broadcast
// ============================================================================

#[tokio::test]
async fn test_websocket_connect_registers_subscriber() {
    let server = start_quiet_server().await;

    let _client = connect(server.addr).await;
    wait_for_subscribers(&server.hub, 1).await;
}

#[tokio::test]
async fn test_published_snapshot_reaches_client() {
    let server = start_quiet_server().await;
    let mut client = connect(server.addr).await;
    wait_for_subscribers(&server.hub, 1).await;

    server.hub.publish(snapshot()).await.unwrap();

    let text = next_text(&mut client).await;
    assert_eq!(text, serde_json::to_string(&snapshot()).unwrap());
}

#[tokio::test]
async fn test_every_client_receives_each_snapshot_once() {
    let server = start_quiet_server().await;

    let mut clients = Vec::new();
    for _ in 0..4 {
        clients.push(connect(server.addr).await);
    }
    wait_for_subscribers(&server.hub, 4).await;

    server.hub.publish(snapshot()).await.unwrap();
    server
        .hub
        .publish(vec![Instrument::new("MSFT", 300.0)])
        .await
        .unwrap();

    for client in clients.iter_mut() {
        let first: Value = serde_json::from_str(&next_text(client).await).unwrap();
        let second: Value = serde_json::from_str(&next_text(client).await).unwrap();
        assert_eq!(first.as_array().unwrap().len(), 2);
        assert_eq!(second[0]["symbol"], "MSFT");
    }
}

#[tokio::test]
async fn test_disconnected_client_is_dropped() {
    let server = start_quiet_server().await;

    let mut leaving = connect(server.addr).await;
    let mut staying = connect(server.addr).await;
    wait_for_subscribers(&server.hub, 2).await;

    leaving.close(None).await.unwrap();
    drop(leaving);
    wait_for_subscribers(&server.hub, 1).await;

    server.hub.publish(snapshot()).await.unwrap();
    next_text(&mut staying).await;
}

#[tokio::test]
async fn test_client_messages_are_ignored() {
    let server = start_quiet_server().await;
    let mut client = connect(server.addr).await;
    wait_for_subscribers(&server.hub, 1).await;

    client
        .send(Message::Text("hello".to_string().into()))
        .await
        .unwrap();
    server.hub.publish(snapshot()).await.unwrap();

    next_text(&mut client).await;
    assert_eq!(server.hub.subscriber_count(), 1);
}

#[tokio::test]
async fn test_client_that_stops_reading_is_released_after_write_timeout() {
    let mut config = ServerConfig::default();
    config.simulation.interval_ms = 600_000;
    config.hub.write_timeout_ms = 200;
    // Deep queue so only the socket write can stall
    config.hub.subscriber_queue = 100_000;
    let server = start_server(config).await;

    // Connected but never read from
    let _idle = connect(server.addr).await;
    wait_for_subscribers(&server.hub, 1).await;

    let large: Vec<Instrument> = (0..6000)
        .map(|i| Instrument::new(format!("SYM{:05}-{}", i, "X".repeat(60)), 1.0))
        .collect();
    for _ in 0..60 {
        server.hub.publish(large.clone()).await.unwrap();
    }

    let released = tokio::time::timeout(Duration::from_secs(10), async {
        while server.hub.subscriber_count() != 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(
        released.is_ok(),
        "idle client still registered after write timeout"
    );
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_simulated_feed_streams_to_client() {
    let server = start_test_server(20).await;
    let mut client = connect(server.addr).await;

    let text = next_text(&mut client).await;
    let prices: Vec<Instrument> = serde_json::from_str(&text).unwrap();

    let symbols: Vec<&str> = prices.iter().map(|i| i.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["AAPL", "AMZN", "GOOGL", "MSFT", "TSLA"]);
    assert!(prices.iter().all(|i| i.price >= 0.01));
}

#[tokio::test]
async fn test_shutdown_stops_server_and_closes_clients() {
    let server = start_quiet_server().await;
    let mut client = connect(server.addr).await;
    wait_for_subscribers(&server.hub, 1).await;

    server.trigger.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("Server did not stop")
        .unwrap();
    assert!(result.is_ok());

    // The connection ends once the hub has let go of the subscriber
    let ended = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}

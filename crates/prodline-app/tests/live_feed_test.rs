//! Live feed integration tests.
//!
//! Start the server on an ephemeral port and subscribe with a real
//! WebSocket client.

use std::time::Duration;

use futures_util::StreamExt;
use prodline_app::{AppConfig, Application};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

fn fast_config(max_connections: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.dashboard.production_interval_ms = 50;
    config.dashboard.rates_interval_ms = 50;
    config.dashboard.max_connections = max_connections;
    config
}

async fn next_json<S>(stream: &mut S) -> Value
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for feed message")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_subscriber_receives_both_feeds() {
    let app = Application::new(fast_config(8)).unwrap();
    let state = app.app_state();
    let registry = app.registry().clone();
    let shutdown = app.shutdown_token();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(prodline_dashboard::serve(listener, state, shutdown.clone()));

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

    // Initial snapshots arrive in topic order, then the timers take over
    assert_eq!(next_json(&mut ws).await["type"], "production_update");
    assert_eq!(next_json(&mut ws).await["type"], "rates_update");

    let mut seen_production = false;
    let mut seen_rates = false;
    while !(seen_production && seen_rates) {
        match next_json(&mut ws).await["type"].as_str() {
            Some("production_update") => seen_production = true,
            Some("rates_update") => seen_rates = true,
            other => panic!("unexpected message type {other:?}"),
        }
    }
    assert_eq!(registry.len(), 1);

    drop(ws);
    timeout(Duration::from_secs(5), async {
        while !registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("subscriber not removed after disconnect");

    shutdown.cancel();
    timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_topic_endpoint_filters_messages() {
    let app = Application::new(fast_config(8)).unwrap();
    let state = app.app_state();
    let shutdown = app.shutdown_token();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(prodline_dashboard::serve(listener, state, shutdown.clone()));

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/rates")).await.unwrap();
    for _ in 0..4 {
        assert_eq!(next_json(&mut ws).await["type"], "rates_update");
    }

    shutdown.cancel();
    timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_connection_limit_and_shutdown_closes_sockets() {
    let app = Application::new(fast_config(1)).unwrap();
    let state = app.app_state();
    let shutdown = app.shutdown_token();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(prodline_dashboard::serve(listener, state, shutdown.clone()));

    let (mut first, _) = connect_async(format!("ws://{addr}/ws/production")).await.unwrap();
    assert_eq!(next_json(&mut first).await["type"], "production_update");

    // Second upgrade is refused with 503
    assert!(connect_async(format!("ws://{addr}/ws/production")).await.is_err());

    shutdown.cancel();
    let closed = timeout(Duration::from_secs(5), async {
        loop {
            match first.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "socket should close on shutdown");

    timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

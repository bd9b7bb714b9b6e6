//! End-to-end tests against an in-process WebSocket server.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::connection::Shared;
use super::*;
use crate::protocol::events;
use crate::server_event::ServerEvent;

const WAIT: Duration = Duration::from_secs(5);

fn config_for(addr: SocketAddr) -> RealtimeConfig {
    RealtimeConfig {
        origin: format!("http://{addr}"),
        max_reconnect_attempts: 5,
        reconnect_delay: Duration::from_millis(20),
        heartbeat_interval: None,
        connect_timeout: Duration::from_secs(2),
    }
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn push(ws: &mut WebSocketStream<TcpStream>, frame: &str) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Next text frame the server receives, parsed as JSON.
async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("server stream ended: {other:?}"),
        }
    }
}

/// A port with nothing listening on it.
async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn collector() -> (Handler, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: Handler = Arc::new(move |data: &Value| {
        let _ = tx.send(data.clone());
    });
    (handler, rx)
}

fn state_log(client: &RealtimeClient) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let l = Arc::clone(&log);
    client.on(
        events::CONNECTION_STATE_CHANGED,
        Arc::new(move |data: &Value| {
            let state = data["state"].as_str().unwrap_or_default().to_string();
            l.lock().unwrap().push(state);
        }),
    );
    log
}

async fn wait_for_state(client: &RealtimeClient, state: ConnectionState) {
    let mut rx = client.watch_state();
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {state}"))
        .unwrap();
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

// ---------------------------------------------------------------------------
// URL and construction
// ---------------------------------------------------------------------------

#[test]
fn ws_url_follows_origin_scheme() {
    assert_eq!(
        ws_url_for_origin("http://localhost:5001").unwrap(),
        "ws://localhost:5001/ws"
    );
    assert_eq!(
        ws_url_for_origin("https://dash.example.org/").unwrap(),
        "wss://dash.example.org/ws"
    );
    assert_eq!(
        ws_url_for_origin("https://dash.example.org/leveling?guild=1").unwrap(),
        "wss://dash.example.org/ws"
    );
}

#[test]
fn ws_url_rejects_other_schemes() {
    assert!(ws_url_for_origin("ftp://dash.example.org").is_err());
    assert!(ws_url_for_origin("dash.example.org").is_err());
    assert!(ws_url_for_origin("http://").is_err());
}

#[test]
fn new_client_is_idle() {
    let client = RealtimeClient::new(RealtimeConfig::default()).unwrap();
    assert_eq!(client.state(), ConnectionState::Idle);
    assert_eq!(client.url(), "ws://localhost:5001/ws");
}

#[test]
fn new_client_rejects_bad_origin() {
    let config = RealtimeConfig {
        origin: "localhost:5001".into(),
        ..RealtimeConfig::default()
    };
    assert!(RealtimeClient::new(config).is_err());
}

#[test]
fn config_from_settings_disables_zero_heartbeat() {
    let settings = drongo_config::RealtimeSettings {
        heartbeat_interval_secs: 0,
        ..Default::default()
    };
    let config = RealtimeConfig::from(&settings);
    assert_eq!(config.heartbeat_interval, None);
    assert_eq!(config.reconnect_delay, Duration::from_millis(2000));
    assert_eq!(config.max_reconnect_attempts, 5);
}

// ---------------------------------------------------------------------------
// Send
// ---------------------------------------------------------------------------

#[test]
fn send_only_writes_while_open() {
    let client = RealtimeClient::new(RealtimeConfig::default()).unwrap();
    let shared = client.shared();
    let epoch = shared.next_epoch();
    let (tx, mut rx) = mpsc::unbounded_channel();
    shared.install_outbound(epoch, tx);

    client.send("ping", None);
    assert!(rx.try_recv().is_err(), "idle client must not write");

    shared.transition_if_current(epoch, ConnectionState::Connecting, 0);
    client.send("ping", None);
    assert!(rx.try_recv().is_err(), "connecting client must not write");

    shared.transition_if_current(epoch, ConnectionState::Open, 0);
    client.ping();
    assert_eq!(rx.try_recv().unwrap(), r#"{"type":"ping"}"#);

    shared.transition_if_current(epoch, ConnectionState::Closed, 0);
    client.request_update();
    assert!(rx.try_recv().is_err(), "closed client must not write");
}

#[test]
fn connect_outside_runtime_is_ignored() {
    let client = RealtimeClient::new(RealtimeConfig::default()).unwrap();
    client.connect();
    assert_eq!(client.state(), ConnectionState::Idle);

    // No task was recorded, so there is nothing to disconnect.
    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Idle);
}

#[test]
fn superseded_epoch_cannot_change_state() {
    let shared = Shared::new();
    let stale = shared.next_epoch();
    shared.transition_if_current(stale, ConnectionState::Open, 0);

    shared.supersede(ConnectionState::Closed, 0);
    shared.transition_if_current(stale, ConnectionState::Reconnecting, 1);
    assert_eq!(shared.state(), ConnectionState::Closed);

    let (tx, mut rx) = mpsc::unbounded_channel();
    shared.install_outbound(stale, tx);
    assert!(!shared.enqueue("{}".into()));
    assert!(rx.try_recv().is_err());
}

#[test]
fn close_wins_over_a_racing_stale_task() {
    for _ in 0..200 {
        let shared = Arc::new(Shared::new());
        let epoch = shared.next_epoch();

        let task = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                for i in 0..200 {
                    let state = if i % 2 == 0 {
                        ConnectionState::Open
                    } else {
                        ConnectionState::Reconnecting
                    };
                    shared.transition_if_current(epoch, state, 0);
                }
            })
        };

        shared.supersede(ConnectionState::Closed, 0);
        task.join().unwrap();
        assert_eq!(shared.state(), ConnectionState::Closed);
    }
}

#[test]
fn send_without_connection_is_silent() {
    let client = RealtimeClient::new(RealtimeConfig::default()).unwrap();
    client.send("foo", Some(json!({"x": 1})));
    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Idle);
}

// ---------------------------------------------------------------------------
// Live connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delivers_pushes_and_sends_envelopes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = RealtimeClient::new(config_for(listener.local_addr().unwrap())).unwrap();
    let (handler, mut stats) = collector();
    client.on(events::STATS_UPDATE, handler);

    client.connect();
    let mut server = accept(&listener).await;
    push(&mut server, r#"{"type":"stats_update","data":{"active_users":7}}"#).await;

    assert_eq!(recv(&mut stats).await, json!({"active_users": 7}));
    wait_for_state(&client, ConnectionState::Open).await;

    client.send("foo", Some(json!({"x": 1})));
    assert_eq!(
        next_json(&mut server).await,
        json!({"type": "foo", "data": {"x": 1}})
    );

    client.request_update();
    assert_eq!(next_json(&mut server).await, json!({"type": "request_update"}));

    client.disconnect();
}

#[tokio::test]
async fn malformed_frames_do_not_break_the_stream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = RealtimeClient::new(config_for(listener.local_addr().unwrap())).unwrap();
    let (handler, mut pongs) = collector();
    client.on(events::PONG, handler);

    client.connect();
    let mut server = accept(&listener).await;
    push(&mut server, "{not json").await;
    push(&mut server, r#"{"no_type":true}"#).await;
    push(&mut server, r#"{"type":"pong"}"#).await;

    assert_eq!(recv(&mut pongs).await, Value::Null);
    assert_eq!(client.state(), ConnectionState::Open);
    client.disconnect();
}

#[tokio::test]
async fn typed_listeners_receive_server_events() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = RealtimeClient::new(config_for(listener.local_addr().unwrap())).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handler: EventHandler = Arc::new(move |event: &ServerEvent| {
        let _ = tx.send(event.clone());
    });
    client.on_event(events::ERROR, handler);

    client.connect();
    let mut server = accept(&listener).await;
    push(&mut server, r#"{"type":"error","message":"Invalid JSON"}"#).await;

    let event = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        event,
        ServerEvent::Error {
            message: "Invalid JSON".into()
        }
    );
    client.disconnect();
}

#[tokio::test]
async fn reconnects_after_server_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = RealtimeClient::new(config_for(listener.local_addr().unwrap())).unwrap();
    let log = state_log(&client);
    let (handler, mut stats) = collector();
    client.on(events::STATS_UPDATE, handler);

    client.connect();
    let mut first = accept(&listener).await;
    first.close(None).await.unwrap();
    drop(first);

    let mut second = accept(&listener).await;
    push(&mut second, r#"{"type":"stats_update","data":{"bot_guilds":3}}"#).await;
    assert_eq!(recv(&mut stats).await, json!({"bot_guilds": 3}));
    wait_for_state(&client, ConnectionState::Open).await;

    let log = log.lock().unwrap().clone();
    assert_eq!(
        log,
        vec!["connecting", "open", "closed", "reconnecting", "connecting", "open"]
    );
    client.disconnect();
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let mut config = config_for(dead_addr().await);
    config.max_reconnect_attempts = 2;
    config.reconnect_delay = Duration::from_millis(10);
    let client = RealtimeClient::new(config).unwrap();
    let log = state_log(&client);

    client.connect();
    wait_for_state(&client, ConnectionState::Exhausted).await;

    let log = log.lock().unwrap().clone();
    let reconnects = log.iter().filter(|s| *s == "reconnecting").count();
    assert_eq!(reconnects, 2);
    assert_eq!(log.last().map(String::as_str), Some("exhausted"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.state(), ConnectionState::Exhausted);
}

#[tokio::test]
async fn backoff_grows_linearly_and_resets_after_open() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = Duration::from_millis(50);
    let mut config = config_for(listener.local_addr().unwrap());
    config.reconnect_delay = base;
    let client = RealtimeClient::new(config).unwrap();

    let (tx, mut transitions) = mpsc::unbounded_channel();
    client.on(
        events::CONNECTION_STATE_CHANGED,
        Arc::new(move |data: &Value| {
            let state = data["state"].as_str().unwrap_or_default().to_string();
            let attempt = data["attempt"].as_u64().unwrap_or_default();
            let _ = tx.send((state, attempt, Instant::now()));
        }),
    );

    tokio::spawn(async move {
        // Three handshakes that never complete, then one open that the
        // server closes, then a session that stays up.
        for _ in 0..3 {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        }
        let mut ws = accept(&listener).await;
        ws.close(None).await.unwrap();
        drop(ws);
        let _held = accept(&listener).await;
        std::future::pending::<()>().await;
    });

    client.connect();

    // (attempt, time spent between Reconnecting and the next Connecting)
    let mut waits = Vec::new();
    let mut pending: Option<(u64, Instant)> = None;
    let mut opened_before_last = false;
    while waits.len() < 4 {
        let (state, attempt, at) = tokio::time::timeout(WAIT, transitions.recv())
            .await
            .expect("timed out waiting for a transition")
            .expect("listener dropped");
        match state.as_str() {
            "reconnecting" => pending = Some((attempt, at)),
            "connecting" => {
                if let Some((attempt, since)) = pending.take() {
                    waits.push((attempt, at - since));
                }
            }
            "open" => opened_before_last = waits.len() == 3,
            _ => {}
        }
    }
    client.disconnect();

    assert!(opened_before_last, "the fourth reconnect must follow an open");
    let attempts: Vec<u64> = waits.iter().map(|(attempt, _)| *attempt).collect();
    assert_eq!(attempts, vec![1, 2, 3, 1]);
    for (attempt, waited) in waits {
        let expected = base * attempt as u32;
        assert!(
            waited >= expected,
            "attempt {attempt} waited {waited:?}, expected at least {expected:?}"
        );
    }
}

#[tokio::test]
async fn disconnect_cancels_pending_reconnect() {
    let mut config = config_for(dead_addr().await);
    config.reconnect_delay = Duration::from_millis(200);
    let client = RealtimeClient::new(config).unwrap();

    client.connect();
    wait_for_state(&client, ConnectionState::Reconnecting).await;

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Closed);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn listeners_survive_disconnect_and_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = RealtimeClient::new(config_for(listener.local_addr().unwrap())).unwrap();
    let (handler, mut stats) = collector();
    client.on(events::STATS_UPDATE, handler);

    client.connect();
    let mut first = accept(&listener).await;
    push(&mut first, r#"{"type":"stats_update","data":1}"#).await;
    assert_eq!(recv(&mut stats).await, json!(1));

    client.disconnect();
    wait_for_state(&client, ConnectionState::Closed).await;
    assert_eq!(client.listener_count(events::STATS_UPDATE), 1);

    client.connect();
    let mut second = accept(&listener).await;
    push(&mut second, r#"{"type":"stats_update","data":2}"#).await;
    assert_eq!(recv(&mut stats).await, json!(2));
    client.disconnect();
}

#[tokio::test]
async fn heartbeat_sends_ping() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = config_for(listener.local_addr().unwrap());
    config.heartbeat_interval = Some(Duration::from_millis(50));
    let client = RealtimeClient::new(config).unwrap();

    client.connect();
    let mut server = accept(&listener).await;
    let frame = tokio::time::timeout(WAIT, next_json(&mut server)).await.unwrap();
    assert_eq!(frame, json!({"type": "ping"}));
    client.disconnect();
}

#[tokio::test]
async fn reconnect_replaces_previous_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = RealtimeClient::new(config_for(listener.local_addr().unwrap())).unwrap();
    let (handler, mut stats) = collector();
    client.on(events::STATS_UPDATE, handler);

    client.connect();
    let mut first = accept(&listener).await;
    wait_for_state(&client, ConnectionState::Open).await;

    client.connect();
    let mut second = accept(&listener).await;

    // The superseded socket is closed by the client.
    let closed = tokio::time::timeout(WAIT, async {
        loop {
            match first.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());

    // A frame read on the new socket means its session is installed.
    push(&mut second, r#"{"type":"stats_update","data":"fresh"}"#).await;
    assert_eq!(recv(&mut stats).await, json!("fresh"));

    client.send("foo", None);
    assert_eq!(next_json(&mut second).await, json!({"type": "foo"}));
    client.disconnect();
}

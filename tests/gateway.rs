#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use discord_gateway_sdk::error::Kind;
use discord_gateway_sdk::gateway::{Client, Event, EventKind, HandlerId};
use discord_gateway_sdk::ws::config::Config;
use discord_gateway_sdk::ws::connection::ConnectionState;
use futures_util::StreamExt as _;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::timeout;

use crate::common::{
    MockGateway, TOKEN, client, fast_config, hello, manual_client, message_create, ready,
    resumed, wait_for_state,
};

/// Connect through the handshake and return the server side of the connection.
async fn connect_ready(gateway: &mut MockGateway, client: &Client) -> common::Connection {
    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });

    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    let identify = conn.recv_frame().await;
    assert_eq!(identify["op"], 2, "first frame must be Identify: {identify}");
    conn.send(ready(1, "session-1", None));

    timeout(Duration::from_secs(2), connecting)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    conn
}

#[tokio::test]
async fn identify_then_ready() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());

    let ready_events = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&ready_events);
    client.on(EventKind::Ready, move |event| {
        if let Event::Ready(ready) = event {
            assert_eq!(ready.session_id, "session-1");
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });

    let mut conn = gateway.next_connection().await;
    assert_eq!(conn.user_agent.as_deref(), Some(discord_gateway_sdk::USER_AGENT));
    conn.send(hello(45_000));

    let identify = conn.recv_frame().await;
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], TOKEN);
    assert_eq!(identify["d"]["intents"], (1 << 0) | (1 << 9));
    assert_eq!(identify["d"]["properties"]["os"], std::env::consts::OS);
    assert!(identify["d"]["properties"]["browser"].is_string());
    assert!(identify["d"]["properties"]["device"].is_string());

    conn.send(ready(1, "session-1", None));
    timeout(Duration::from_secs(2), connecting)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(client.is_connected());
    let session = client.session();
    assert_eq!(session.session_id.as_deref(), Some("session-1"));
    assert_eq!(session.sequence, Some(1));
    assert!(session.connected_since.is_some());
    assert_eq!(ready_events.load(Ordering::SeqCst), 1);

    // Already connected: resolves immediately, no new transport.
    client.connect().await.unwrap();
    assert!(gateway.no_connection_within(Duration::from_millis(100)).await);
}

#[tokio::test]
async fn resumable_close_resumes_with_highest_sequence() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());
    let mut conn = connect_ready(&mut gateway, &client).await;

    for seq in [2, 5, 3] {
        conn.send(message_create(seq, "hi"));
    }
    // Heartbeat round-trips are not dispatches and carry no sequence.
    conn.send(json!({"op": 11}));
    wait_for(|| client.session().sequence == Some(5)).await;

    conn.close(4000, "Unknown error");

    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    let resume = conn.recv_frame().await;
    assert_eq!(resume["op"], 6, "first frame must be Resume: {resume}");
    assert_eq!(resume["d"]["token"], TOKEN);
    assert_eq!(resume["d"]["session_id"], "session-1");
    assert_eq!(resume["d"]["seq"], 5);

    conn.send(resumed(6));
    wait_for_state(&client, ConnectionState::is_connected).await;
    assert_eq!(client.session().session_id.as_deref(), Some("session-1"));
    assert_eq!(client.session().sequence, Some(6));
}

#[tokio::test]
async fn resume_uses_resume_gateway_url() {
    let mut gateway = MockGateway::start().await;
    let mut resume_gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());

    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });
    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    conn.recv_frame().await;
    conn.send(ready(1, "session-1", Some(&resume_gateway.base_url())));
    connecting.await.unwrap().unwrap();

    conn.close(4000, "Unknown error");

    let mut resumed_conn = resume_gateway.next_connection().await;
    assert_eq!(resumed_conn.query.as_deref(), Some("v=10&encoding=json"));
    resumed_conn.send(hello(45_000));
    assert_eq!(resumed_conn.recv_frame().await["op"], 6);
    assert!(gateway.no_connection_within(Duration::from_millis(100)).await);
}

#[tokio::test]
async fn fatal_close_never_reconnects() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());
    let mut events = Box::pin(client.events());

    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });

    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    conn.recv_frame().await;
    conn.close(4014, "Disallowed intent(s).");

    let err = timeout(Duration::from_secs(2), connecting)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Fatal);
    assert!(err.is_fatal());

    wait_for_state(&client, |state| state == ConnectionState::Closed).await;
    assert!(gateway.no_connection_within(Duration::from_millis(300)).await);
    assert_eq!(client.state(), ConnectionState::Closed);

    let closed = next_event(&mut events).await;
    assert!(matches!(closed, Event::Closed { code: 4014, .. }), "{closed:?}");
    let error = next_event(&mut events).await;
    assert!(matches!(&error, Event::Error(e) if e.is_fatal()), "{error:?}");
}

#[tokio::test]
async fn session_invalidating_close_identifies_again() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());
    let conn = connect_ready(&mut gateway, &client).await;

    conn.close(4009, "Session timed out.");

    let mut conn = gateway.next_connection().await;
    assert_eq!(client.session().session_id, None);
    conn.send(hello(45_000));
    assert_eq!(conn.recv_frame().await["op"], 2);
}

#[tokio::test]
async fn heartbeats_follow_hello_interval() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());

    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });

    let mut conn = gateway.next_connection().await;
    let hello_sent = Instant::now();
    conn.send(hello(200));
    assert_eq!(conn.recv_frame().await["op"], 2);
    conn.send(ready(3, "session-1", None));
    connecting.await.unwrap().unwrap();

    let first = conn.recv_frame().await;
    let elapsed = hello_sent.elapsed();
    assert_eq!(first["op"], 1);
    assert_eq!(first["d"], 3);
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(600), "{elapsed:?}");
    conn.send(json!({"op": 11}));

    let second = conn.recv_frame().await;
    assert_eq!(second["op"], 1);
    assert!(hello_sent.elapsed() >= Duration::from_millis(400));
    conn.send(json!({"op": 11}));

    let session = client.session();
    assert!(session.last_heartbeat_sent_at.is_some());
    wait_for(|| client.session().last_heartbeat_acked_at.is_some()).await;
    assert!(client.is_connected());
}

#[tokio::test]
async fn heartbeat_before_any_dispatch_is_null() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());

    let _connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });

    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    assert_eq!(conn.recv_frame().await["op"], 2);

    // Remote-requested heartbeat is answered right away.
    conn.send(json!({"op": 1, "d": null}));
    let heartbeat = conn.recv_frame().await;
    assert_eq!(heartbeat["op"], 1);
    assert!(heartbeat["d"].is_null());
}

#[tokio::test]
async fn unacknowledged_heartbeats_reconnect() {
    let mut gateway = MockGateway::start().await;
    let mut config = fast_config();
    config.missed_heartbeat_limit = Some(2);
    let client = client(&gateway, config);
    let mut events = Box::pin(client.events());

    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });
    let mut conn = gateway.next_connection().await;
    conn.send(hello(50));
    conn.recv_frame().await;
    conn.send(ready(1, "session-1", None));
    connecting.await.unwrap().unwrap();
    assert!(matches!(next_event(&mut events).await, Event::Ready(_)));

    // Never acknowledge.
    let mut conn = gateway.next_connection().await;
    let closed = next_event(&mut events).await;
    assert!(matches!(closed, Event::Closed { code: 1012, .. }), "{closed:?}");

    conn.send(hello(45_000));
    assert_eq!(conn.recv_frame().await["op"], 6);
}

#[tokio::test]
async fn disconnect_while_connecting_aborts() {
    // Accepts TCP but never completes the WebSocket upgrade.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let held = Arc::new(Mutex::new(Vec::new()));
    tokio::spawn({
        let held = Arc::clone(&held);
        async move {
            while let Ok((stream, _)) = listener.accept().await {
                held.lock().unwrap().push(stream);
            }
        }
    });

    let client = common::client_for(&format!("ws://{addr}/?v=10&encoding=json"), fast_config());
    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });
    wait_for_state(&client, |state| state == ConnectionState::Connecting).await;

    client.disconnect().await;

    let err = timeout(Duration::from_secs(1), connecting)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Aborted);
    assert_eq!(client.state(), ConnectionState::Closed);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(held.lock().unwrap().len(), 1, "no reconnect after disconnect");
}

#[tokio::test]
async fn disconnect_sends_going_away_and_keeps_session() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());
    let mut conn = connect_ready(&mut gateway, &client).await;
    let mut events = Box::pin(client.events());

    client.disconnect().await;

    assert_eq!(conn.recv_close().await, Some(1001));
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(matches!(
        next_event(&mut events).await,
        Event::Closed { code: 1001, .. }
    ));
    assert_eq!(client.session().session_id.as_deref(), Some("session-1"));
    assert!(gateway.no_connection_within(Duration::from_millis(200)).await);

    // Idempotent.
    client.disconnect().await;

    // A later connect resumes the kept session.
    let reconnecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });
    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    assert_eq!(conn.recv_frame().await["op"], 6);
    conn.send(resumed(2));
    reconnecting.await.unwrap().unwrap();
}

#[tokio::test]
async fn explicit_reconnect_skips_backoff() {
    let mut gateway = MockGateway::start().await;
    let mut config = fast_config();
    config.reconnect.initial_backoff = Duration::from_secs(30);
    config.reconnect.max_backoff = Duration::from_secs(60);
    let client = client(&gateway, config);
    let mut conn = connect_ready(&mut gateway, &client).await;

    let reconnecting = tokio::spawn({
        let client = client.clone();
        async move { client.reconnect().await }
    });

    assert_eq!(conn.recv_close().await, Some(1001));
    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    assert_eq!(conn.recv_frame().await["op"], 6);
    conn.send(resumed(2));

    timeout(Duration::from_secs(2), reconnecting)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(client.is_connected());
}

#[tokio::test]
async fn invalid_session_resumable_then_not() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());
    let mut conn = connect_ready(&mut gateway, &client).await;
    conn.send(message_create(4, "hi"));
    wait_for(|| client.session().sequence == Some(4)).await;

    conn.send(json!({"op": 9, "d": true}));

    // Resumable: a new transport, Resume, session kept.
    let mut conn = gateway.next_connection().await;
    assert_eq!(client.session().session_id.as_deref(), Some("session-1"));
    conn.send(hello(45_000));
    let resume = conn.recv_frame().await;
    assert_eq!(resume["op"], 6);
    assert_eq!(resume["d"]["seq"], 4);

    // Not resumable: session cleared, Identify on the same transport.
    conn.send(json!({"op": 9, "d": false}));
    let identify = conn.recv_frame().await;
    assert_eq!(identify["op"], 2);
    assert_eq!(client.session().session_id, None);
    assert_eq!(client.session().sequence, None);

    conn.send(ready(1, "session-2", None));
    wait_for_state(&client, ConnectionState::is_connected).await;
    assert_eq!(client.session().session_id.as_deref(), Some("session-2"));
}

#[tokio::test]
async fn reconnect_opcode_resumes_immediately() {
    let mut gateway = MockGateway::start().await;
    let mut config = fast_config();
    config.reconnect.initial_backoff = Duration::from_secs(30);
    config.reconnect.max_backoff = Duration::from_secs(60);
    let client = client(&gateway, config);
    let mut conn = connect_ready(&mut gateway, &client).await;

    conn.send(json!({"op": 7, "d": null}));

    assert_eq!(conn.recv_close().await, Some(1012));
    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    assert_eq!(conn.recv_frame().await["op"], 6);
}

#[tokio::test]
async fn remote_requested_resume_ignores_auto_reconnect() {
    let mut gateway = MockGateway::start().await;
    let client = manual_client(&gateway, fast_config());
    let mut conn = connect_ready(&mut gateway, &client).await;

    for request in [json!({"op": 7, "d": null}), json!({"op": 9, "d": true})] {
        conn.send(request.clone());

        assert_eq!(conn.recv_close().await, Some(1012), "{request}");
        conn = gateway.next_connection().await;
        conn.send(hello(45_000));
        let resume = conn.recv_frame().await;
        assert_eq!(resume["op"], 6, "{request}: {resume}");
        assert_eq!(resume["d"]["session_id"], "session-1");

        conn.send(resumed(2));
        wait_for_state(&client, ConnectionState::is_connected).await;
    }

    // A dropped transport is still left alone.
    conn.close(4000, "Unknown error");
    wait_for_state(&client, |state| state == ConnectionState::Closed).await;
    assert!(gateway.no_connection_within(Duration::from_millis(200)).await);
}

#[tokio::test]
async fn disconnect_cancels_pending_reconnect() {
    let mut gateway = MockGateway::start().await;
    let mut config = fast_config();
    config.reconnect.initial_backoff = Duration::from_millis(300);
    config.reconnect.max_backoff = Duration::from_secs(1);
    let client = client(&gateway, config);
    let conn = connect_ready(&mut gateway, &client).await;

    conn.close(4000, "Unknown error");
    wait_for_state(&client, |state| {
        matches!(state, ConnectionState::Reconnecting { .. })
    })
    .await;

    client.disconnect().await;

    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(gateway.no_connection_within(Duration::from_millis(800)).await);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn attempt_counter_restarts_after_ready() {
    let mut gateway = MockGateway::start().await;
    let mut config = fast_config();
    config.reconnect.initial_backoff = Duration::from_millis(100);
    config.reconnect.max_backoff = Duration::from_secs(1);
    config.reconnect.jitter = 0.0;
    let client = client(&gateway, config);
    let conn = connect_ready(&mut gateway, &client).await;

    // Two failed attempts in a row.
    conn.close(4000, "Unknown error");
    wait_for_state(&client, |state| {
        matches!(state, ConnectionState::Reconnecting { attempt: 1, .. })
    })
    .await;
    let conn = gateway.next_connection().await;
    conn.close(4000, "Unknown error");
    wait_for_state(&client, |state| {
        matches!(state, ConnectionState::Reconnecting { attempt: 2, .. })
    })
    .await;

    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    assert_eq!(conn.recv_frame().await["op"], 6);
    conn.send(resumed(2));
    wait_for_state(&client, ConnectionState::is_connected).await;

    conn.close(4000, "Unknown error");
    wait_for_state(&client, |state| {
        matches!(
            state,
            ConnectionState::Reconnecting { attempt: 1, delay } if delay == Duration::from_millis(100)
        )
    })
    .await;
}

#[tokio::test]
async fn unusable_hello_fails_fast_and_reconnects() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());
    let mut events = Box::pin(client.events());

    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });

    let mut conn = gateway.next_connection().await;
    conn.send(json!({"op": 10, "d": {}}));

    // Well before the two second handshake timeout.
    let err = timeout(Duration::from_millis(500), connecting)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Protocol);
    assert_eq!(conn.recv_close().await, Some(1012));

    let closed = next_event(&mut events).await;
    assert!(matches!(closed, Event::Closed { code: 1012, .. }), "{closed:?}");
    let error = next_event(&mut events).await;
    assert!(matches!(&error, Event::Error(e) if e.kind() == Kind::Protocol), "{error:?}");

    // An interval too large to schedule is refused the same way.
    let mut conn = gateway.next_connection().await;
    conn.send(json!({"op": 10, "d": {"heartbeat_interval": u64::MAX}}));
    assert_eq!(conn.recv_close().await, Some(1012));

    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    assert_eq!(conn.recv_frame().await["op"], 2);
}

#[tokio::test]
async fn ready_without_optional_fields_is_published() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());
    let mut events = Box::pin(client.events());

    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });
    let mut conn = gateway.next_connection().await;
    conn.send(hello(45_000));
    conn.recv_frame().await;
    conn.send(json!({
        "op": 0,
        "t": "READY",
        "s": 1,
        "d": {
            "user": {"id": "80351110224678912", "username": "bot"},
            "session_id": "session-1",
        }
    }));
    timeout(Duration::from_secs(2), connecting)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let Event::Ready(ready) = next_event(&mut events).await else {
        panic!("expected Ready");
    };
    assert_eq!(ready.session_id, "session-1");
    assert!(ready.guilds.is_empty());
}

#[tokio::test]
async fn handshake_timeouts_back_off() {
    let gateway = MockGateway::start().await;
    let mut config = fast_config();
    config.handshake_timeout = Duration::from_millis(100);
    config.reconnect.initial_backoff = Duration::from_millis(50);
    config.reconnect.max_backoff = Duration::from_secs(2);
    config.reconnect.jitter = 0.0;
    let client = client(&gateway, config);

    // Every connection gets a Hello and nothing else.
    let mut gateway = gateway;
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Some(mut conn) = gateway.try_next_connection(Duration::from_secs(5)).await {
            conn.send(hello(45_000));
            open.push(conn);
        }
    });

    let mut states = client.state_receiver();
    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });

    let mut attempts = Vec::new();
    while attempts.len() < 5 {
        timeout(Duration::from_secs(5), states.changed())
            .await
            .unwrap()
            .unwrap();
        if let ConnectionState::Reconnecting { attempt, delay } = *states.borrow_and_update()
            && attempts.last().is_none_or(|(last, _)| *last != attempt)
        {
            attempts.push((attempt, delay));
        }
    }

    let err = connecting.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), Kind::Timeout);

    let numbers: Vec<u32> = attempts.iter().map(|(attempt, _)| *attempt).collect();
    assert_eq!(numbers, [1, 2, 3, 4, 5]);
    assert!(attempts[0].1 >= Duration::from_millis(45), "{attempts:?}");
    for pair in attempts.windows(2) {
        assert!(pair[1].1 > pair[0].1, "{attempts:?}");
    }

    client.disconnect().await;
}

#[tokio::test]
async fn max_attempts_gives_up() {
    // Nothing listens on this port once the listener is dropped.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = fast_config();
    config.reconnect.max_attempts = Some(2);
    let client = common::client_for(&format!("ws://{addr}/?v=10&encoding=json"), config);
    let mut events = Box::pin(client.events());

    let err = client.connect().await.unwrap_err();
    assert_eq!(err.kind(), Kind::Transport);

    wait_for_state(&client, |state| state == ConnectionState::Closed).await;

    let mut errors = Vec::new();
    while errors.len() < 4 {
        if let Event::Error(e) = next_event(&mut events).await {
            errors.push(e);
        }
    }
    // Three failed opens, then the give-up notice.
    assert!(errors[..3].iter().all(|e| e.kind() == Kind::Transport));
    assert!(errors[3].to_string().contains("gave up reconnecting after 2 attempts"));
}

#[tokio::test]
async fn handler_can_unsubscribe_itself() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());

    let calls = Arc::new(AtomicUsize::new(0));
    let others = Arc::new(AtomicUsize::new(0));
    let own_id: Arc<OnceLock<HandlerId>> = Arc::new(OnceLock::new());

    let id = client.on(EventKind::MessageCreate, {
        let calls = Arc::clone(&calls);
        let own_id = Arc::clone(&own_id);
        let client = client.clone();
        move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = own_id.get() {
                client.off(*id);
            }
        }
    });
    own_id.set(id).unwrap();
    client.on(EventKind::MessageCreate, {
        let others = Arc::clone(&others);
        move |_| {
            others.fetch_add(1, Ordering::SeqCst);
        }
    });

    let mut events = Box::pin(client.events());
    let conn = connect_ready(&mut gateway, &client).await;
    conn.send(message_create(2, "one"));
    conn.send(message_create(3, "two"));

    let mut seen = 0;
    while seen < 2 {
        if let Event::MessageCreate(_) = next_event(&mut events).await {
            seen += 1;
        }
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(others.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn event_stream_yields_typed_events() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());
    let mut events = Box::pin(client.events());

    let conn = connect_ready(&mut gateway, &client).await;
    conn.send(json!({"op": 0, "t": "TYPING_START", "s": 2, "d": {"channel_id": "1"}}));
    conn.send(json!({"op": 0, "t": "MESSAGE_CREATE", "s": 3, "d": {"broken": true}}));
    conn.send(message_create(4, "hello there"));

    let Event::Ready(ready) = next_event(&mut events).await else {
        panic!("expected Ready first");
    };
    assert_eq!(ready.user.username, "bot");

    // Unknown names are ignored and undecodable payloads dropped.
    let Event::MessageCreate(message) = next_event(&mut events).await else {
        panic!("expected the decodable MESSAGE_CREATE");
    };
    assert_eq!(message.content, "hello there");
    assert!(client.is_connected());
    assert_eq!(client.session().sequence, Some(4));
}

#[tokio::test]
async fn undecodable_frame_keeps_connection() {
    let mut gateway = MockGateway::start().await;
    let client = client(&gateway, fast_config());
    let mut conn = connect_ready(&mut gateway, &client).await;

    conn.send_raw("{not json");
    conn.send_raw(r#"{"op": 42}"#);
    conn.send(json!({"op": 1, "d": null}));

    assert_eq!(conn.recv_frame().await["op"], 1);
    assert!(client.is_connected());
}

async fn next_event<S>(events: &mut S) -> Event
where
    S: futures_util::Stream<Item = discord_gateway_sdk::Result<Event>> + Unpin,
{
    timeout(Duration::from_secs(2), events.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap()
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[test]
fn default_config_matches_docs() {
    let config = Config::default();
    assert_eq!(config.handshake_timeout, Duration::from_secs(10));
    assert_eq!(config.missed_heartbeat_limit, Some(2));
}

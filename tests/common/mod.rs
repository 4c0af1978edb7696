#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Not every test binary uses every helper"
)]

use std::net::SocketAddr;
use std::time::Duration;

use discord_gateway_sdk::gateway::{Client, ClientConfig, HandshakeConfig, Intents};
use discord_gateway_sdk::ws::config::Config;
use discord_gateway_sdk::ws::connection::ConnectionState;
use futures_util::{SinkExt as _, StreamExt as _};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;

pub const TOKEN: &str = "test-token";

/// What the mock saw from the client.
#[derive(Debug)]
pub enum Inbound {
    Frame(Value),
    Close(Option<u16>),
}

enum Outbound {
    Text(String),
    Close(u16, &'static str),
}

/// Mock gateway. Every accepted connection is handed to the test as a
/// [`Connection`] that the test scripts frame by frame.
pub struct MockGateway {
    addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<Connection>,
}

/// Server side of one client connection.
pub struct Connection {
    /// `User-Agent` of the upgrade request
    pub user_agent: Option<String>,
    /// Query string of the upgrade request
    pub query: Option<String>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl MockGateway {
    /// Start a mock gateway on a random port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (connection_tx, connections) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };

                let (seen_tx, seen_rx) = oneshot::channel();
                let callback = move |request: &Request,
                                     response: Response|
                      -> Result<Response, ErrorResponse> {
                    let user_agent = request
                        .headers()
                        .get(USER_AGENT)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    let query = request.uri().query().map(str::to_owned);
                    drop(seen_tx.send((user_agent, query)));
                    Ok(response)
                };
                let Ok(ws_stream) = tokio_tungstenite::accept_hdr_async(stream, callback).await
                else {
                    continue;
                };
                let (user_agent, query) = seen_rx.await.unwrap_or_default();

                let (inbound_tx, inbound) = mpsc::unbounded_channel();
                let (outbound, outbound_rx) = mpsc::unbounded_channel();
                tokio::spawn(serve(ws_stream, inbound_tx, outbound_rx));

                let connection = Connection {
                    user_agent,
                    query,
                    inbound,
                    outbound,
                };
                if connection_tx.send(connection).is_err() {
                    break;
                }
            }
        });

        Self { addr, connections }
    }

    /// Gateway URL with the usual query.
    pub fn url(&self) -> String {
        format!("ws://{}/?v=10&encoding=json", self.addr)
    }

    /// Bare URL, as a `resume_gateway_url` would be sent.
    pub fn base_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// The next client connection. Panics after two seconds.
    pub async fn next_connection(&mut self) -> Connection {
        self.try_next_connection(Duration::from_secs(2))
            .await
            .expect("client did not connect")
    }

    pub async fn try_next_connection(&mut self, wait: Duration) -> Option<Connection> {
        timeout(wait, self.connections.recv()).await.ok().flatten()
    }

    /// `true` if the client does not open a connection within `wait`.
    pub async fn no_connection_within(&mut self, wait: Duration) -> bool {
        self.try_next_connection(wait).await.is_none()
    }
}

impl Connection {
    pub fn send(&self, frame: Value) {
        drop(self.outbound.send(Outbound::Text(frame.to_string())));
    }

    pub fn send_raw(&self, text: &str) {
        drop(self.outbound.send(Outbound::Text(text.to_owned())));
    }

    /// Close the socket from the server side with `code`.
    pub fn close(&self, code: u16, reason: &'static str) {
        drop(self.outbound.send(Outbound::Close(code, reason)));
    }

    /// Next JSON frame from the client. Panics after two seconds or on close.
    pub async fn recv_frame(&mut self) -> Value {
        match timeout(Duration::from_secs(2), self.inbound.recv()).await {
            Ok(Some(Inbound::Frame(frame))) => frame,
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    /// Close code sent by the client, skipping any frames before it.
    pub async fn recv_close(&mut self) -> Option<u16> {
        loop {
            match timeout(Duration::from_secs(2), self.inbound.recv()).await {
                Ok(Some(Inbound::Frame(_))) => {}
                Ok(Some(Inbound::Close(code))) => return code,
                other => panic!("expected a close frame, got {other:?}"),
            }
        }
    }
}

async fn serve(
    ws_stream: WebSocketStream<TcpStream>,
    inbound: mpsc::UnboundedSender<Inbound>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let (mut write, mut read) = ws_stream.split();
    let mut scripted = true;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame = serde_json::from_str(text.as_str()).unwrap();
                        drop(inbound.send(Inbound::Frame(frame)));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        drop(inbound.send(Inbound::Close(frame.map(|f| u16::from(f.code)))));
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
            action = outbound.recv(), if scripted => {
                match action {
                    Some(Outbound::Text(text)) => {
                        if write.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Close(code, reason)) => {
                        let frame = CloseFrame {
                            code: code.into(),
                            reason: reason.into(),
                        };
                        drop(write.send(Message::Close(Some(frame))).await);
                    }
                    // The test dropped its handle: keep the socket open and
                    // keep draining so the client is not disturbed.
                    None => scripted = false,
                }
            }
        }
    }
}

/// Short timeouts and backoff so tests run fast.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.handshake_timeout = Duration::from_secs(2);
    config.close_timeout = Duration::from_millis(200);
    config.reconnect.initial_backoff = Duration::from_millis(20);
    config.reconnect.max_backoff = Duration::from_millis(200);
    config
}

pub fn client(gateway: &MockGateway, config: Config) -> Client {
    client_for(&gateway.url(), config)
}

pub fn client_for(url: &str, config: Config) -> Client {
    build_client(url, config, true)
}

/// Like [`client`], but only the remote can trigger a reconnect.
pub fn manual_client(gateway: &MockGateway, config: Config) -> Client {
    build_client(&gateway.url(), config, false)
}

fn build_client(url: &str, config: Config, auto_reconnect: bool) -> Client {
    let handshake = HandshakeConfig::builder()
        .token(TOKEN)
        .intents(Intents::GUILDS | Intents::GUILD_MESSAGES)
        .build();
    let config = ClientConfig::builder()
        .handshake(handshake)
        .gateway_url(url)
        .auto_reconnect(auto_reconnect)
        .ws(config)
        .build();

    Client::new(config).unwrap()
}

/// Wait until the client's state satisfies `condition`. Panics after two seconds.
pub async fn wait_for_state<F>(client: &Client, condition: F)
where
    F: Fn(ConnectionState) -> bool,
{
    let mut states = client.state_receiver();
    timeout(Duration::from_secs(2), states.wait_for(|state| condition(*state)))
        .await
        .unwrap()
        .unwrap();
}

pub fn hello(heartbeat_interval: u64) -> Value {
    json!({"op": 10, "d": {"heartbeat_interval": heartbeat_interval}})
}

pub fn ready(seq: u64, session_id: &str, resume_gateway_url: Option<&str>) -> Value {
    json!({
        "op": 0,
        "t": "READY",
        "s": seq,
        "d": {
            "v": 10,
            "user": {"id": "80351110224678912", "username": "bot", "bot": true},
            "guilds": [{"id": "41771983423143937", "unavailable": true}],
            "session_id": session_id,
            "resume_gateway_url": resume_gateway_url,
        }
    })
}

pub fn resumed(seq: u64) -> Value {
    json!({"op": 0, "t": "RESUMED", "s": seq, "d": null})
}

pub fn message_create(seq: u64, content: &str) -> Value {
    json!({
        "op": 0,
        "t": "MESSAGE_CREATE",
        "s": seq,
        "d": {
            "id": (1000 + seq).to_string(),
            "channel_id": "41771983423143937",
            "author": {"id": "80351110224678912", "username": "someone"},
            "content": content,
            "timestamp": "2024-01-01T12:00:00.000000+00:00",
        }
    })
}

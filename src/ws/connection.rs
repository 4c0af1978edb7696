#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

//! The lifecycle driver: one task that owns the socket, the session and every
//! timer of a gateway client.
//!
//! The public [`Client`](crate::gateway::Client) talks to the driver through a
//! command channel. Timers and the transport opener run as separate tasks
//! that report back over a signal channel, so only the driver ever writes the
//! connection state or the session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use backoff::backoff::Backoff as _;
use futures::{SinkExt as _, StreamExt as _};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::backoff::ReconnectPolicy;
use super::config::Config;
use super::error::WsError;
use super::heartbeat::{Beat, HeartbeatScheduler};
use super::proxy::ProxyConfig;
use super::timer::TimerSlot;
use super::transport::{self, WsStream};
use crate::Result;
use crate::error::Error;
use crate::gateway::close_code::{Disposition, classify};
use crate::gateway::dispatcher::Dispatcher;
use crate::gateway::events::Event;
use crate::gateway::frame::{Frame, OpCode};
use crate::gateway::{HandshakeConfig, Session};

/// Close code reported when the transport ended without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

/// Longest heartbeat interval accepted from Hello.
const MAX_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Connection state of one gateway client.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, never connected
    Idle,
    /// Opening the transport
    Connecting,
    /// Transport open, waiting for the remote's Hello
    AwaitingHello,
    /// Identify sent, waiting for `READY`
    Identifying,
    /// Resume sent, waiting for `RESUMED`
    Resuming,
    /// Handshake complete
    Ready {
        /// When the handshake completed
        since: Instant,
    },
    /// Local disconnect in progress, waiting for the close acknowledgement
    Closing,
    /// Waiting for the reconnect timer
    Reconnecting {
        /// Consecutive failed attempts since the last `Ready`
        attempt: u32,
        /// Delay before this attempt opens the transport
        delay: Duration,
    },
    /// Not connected and not going to reconnect on its own
    Closed,
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Whether a handshake is in flight.
    #[must_use]
    pub const fn is_handshaking(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingHello | Self::Identifying | Self::Resuming
        )
    }
}

/// Immutable per-client settings, resolved and validated by the client.
#[derive(Debug)]
pub(crate) struct DriverConfig {
    pub(crate) gateway_url: Url,
    pub(crate) proxy: Option<ProxyConfig>,
    pub(crate) user_agent: String,
    pub(crate) auto_reconnect: bool,
    pub(crate) ws: Config,
}

/// Channels the driver publishes through. The client keeps the other ends.
pub(crate) struct Outputs {
    pub(crate) state: watch::Sender<ConnectionState>,
    pub(crate) session: watch::Sender<Session>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) events: broadcast::Sender<Event>,
}

pub(crate) enum Command {
    Connect(oneshot::Sender<Result<()>>),
    Disconnect(oneshot::Sender<()>),
    Reconnect(oneshot::Sender<Result<()>>),
    SetHandshake(HandshakeConfig),
}

/// Reports from the driver's helper tasks. Each carries the generation of the
/// task that sent it so stale reports can be dropped.
pub(crate) enum Signal {
    Opened {
        generation: u64,
        result: Box<Result<WsStream>>,
    },
    HeartbeatDue {
        generation: u64,
    },
    ReconnectDue {
        generation: u64,
    },
    HandshakeTimedOut {
        generation: u64,
    },
}

pub(crate) struct Driver {
    config: Arc<DriverConfig>,
    handshake: HandshakeConfig,
    session: Session,
    outputs: Outputs,
    commands: mpsc::UnboundedReceiver<Command>,
    signals_tx: mpsc::UnboundedSender<Signal>,
    signals: mpsc::UnboundedReceiver<Signal>,
    shutdown: CancellationToken,
    socket: Option<WsStream>,
    opening: TimerSlot,
    handshake_timer: TimerSlot,
    reconnect_timer: TimerSlot,
    heartbeat: HeartbeatScheduler,
    policy: ReconnectPolicy,
    waiters: Vec<oneshot::Sender<Result<()>>>,
}

impl Driver {
    pub(crate) fn new(
        config: DriverConfig,
        handshake: HandshakeConfig,
        outputs: Outputs,
        commands: mpsc::UnboundedReceiver<Command>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let (signals_tx, signals) = mpsc::unbounded_channel();
        let heartbeat = HeartbeatScheduler::new(config.ws.missed_heartbeat_limit);
        let policy = ReconnectPolicy::new(config.ws.reconnect.clone())?;

        Ok(Self {
            config: Arc::new(config),
            handshake,
            session: Session::default(),
            outputs,
            commands,
            signals_tx,
            signals,
            shutdown,
            socket: None,
            opening: TimerSlot::default(),
            handshake_timer: TimerSlot::default(),
            reconnect_timer: TimerSlot::default(),
            heartbeat,
            policy,
            waiters: Vec::new(),
        })
    }

    /// Main loop: commands, helper-task signals and socket reads, one at a time.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },

                Some(signal) = self.signals.recv() => self.handle_signal(signal).await,

                inbound = next_message(&mut self.socket) => self.handle_inbound(inbound).await,
            }
        }

        self.stop_timers();
        self.fail_waiters(&Arc::new(Error::aborted()));
        if let Some(socket) = self.socket.take() {
            retire(socket, WsCloseCode::Away, self.config.ws.close_timeout);
        }
        self.set_state(ConnectionState::Closed);

        #[cfg(feature = "tracing")]
        tracing::debug!("gateway driver stopped");
    }

    fn state(&self) -> ConnectionState {
        *self.outputs.state.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.outputs.state.send_replace(state);

        #[cfg(feature = "tracing")]
        if previous != state {
            tracing::debug!(from = ?previous, to = ?state, "connection state changed");
        }
        #[cfg(not(feature = "tracing"))]
        let _ = previous;
    }

    fn publish_session(&self) {
        self.outputs.session.send_replace(self.session.clone());
    }

    fn publish(&self, event: Event) {
        self.outputs.dispatcher.publish(&event);
        // No stream subscribers is fine.
        _ = self.outputs.events.send(event);
    }

    fn fail_waiters(&mut self, error: &Arc<Error>) {
        for waiter in self.waiters.drain(..) {
            _ = waiter.send(Err(Error::shared(error)));
        }
    }

    fn stop_timers(&mut self) {
        self.opening.cancel();
        self.handshake_timer.cancel();
        self.reconnect_timer.cancel();
        self.heartbeat.stop();
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(reply) => self.connect(reply),
            Command::Disconnect(reply) => {
                self.disconnect().await;
                _ = reply.send(());
            }
            Command::Reconnect(reply) => {
                self.disconnect().await;
                self.connect(reply);
            }
            Command::SetHandshake(handshake) => {
                #[cfg(feature = "tracing")]
                tracing::info!(intents = %handshake.intents, "handshake identity replaced, session cleared");

                self.handshake = handshake;
                self.session.clear();
                self.publish_session();
            }
        }
    }

    fn connect(&mut self, reply: oneshot::Sender<Result<()>>) {
        let state = self.state();
        if state.is_connected() {
            _ = reply.send(Ok(()));
            return;
        }

        self.waiters.push(reply);
        if state.is_handshaking() {
            return;
        }
        if !matches!(state, ConnectionState::Reconnecting { .. }) {
            self.policy.reset();
        }
        self.start_open();
    }

    async fn disconnect(&mut self) {
        self.stop_timers();
        self.fail_waiters(&Arc::new(Error::aborted()));

        if let Some(mut socket) = self.socket.take() {
            self.set_state(ConnectionState::Closing);

            let frame = CloseFrame {
                code: WsCloseCode::Away,
                reason: "client disconnect".into(),
            };
            let acknowledged = async {
                socket.close(Some(frame)).await?;
                while let Some(message) = socket.next().await {
                    if let Message::Close(_) = message? {
                        break;
                    }
                }
                Ok::<(), tungstenite::Error>(())
            };
            let outcome = timeout(self.config.ws.close_timeout, acknowledged).await;

            #[cfg(feature = "tracing")]
            match outcome {
                Ok(Ok(())) => tracing::debug!("close acknowledged"),
                Ok(Err(e)) => tracing::debug!(error = %e, "socket ended while closing"),
                Err(_) => tracing::warn!(
                    timeout = ?self.config.ws.close_timeout,
                    "close not acknowledged in time"
                ),
            }
            #[cfg(not(feature = "tracing"))]
            let _ = outcome;

            self.publish(Event::Closed {
                code: u16::from(WsCloseCode::Away),
                reason: "client disconnect".to_owned(),
            });
        }

        self.set_state(ConnectionState::Closed);
    }

    /// Endpoint for the next transport: the resume URL when resuming, else the
    /// configured gateway URL.
    fn endpoint(&self) -> Url {
        let resume_url = self
            .session
            .can_resume()
            .then(|| self.session.resume_gateway_url.as_deref())
            .flatten()
            .and_then(|raw| Url::parse(raw).ok());

        match resume_url {
            Some(mut url) => {
                if url.query().is_none() {
                    url.set_query(self.config.gateway_url.query());
                }
                url
            }
            None => self.config.gateway_url.clone(),
        }
    }

    fn start_open(&mut self) {
        self.reconnect_timer.cancel();
        self.set_state(ConnectionState::Connecting);

        if !self.handshake_timer.is_armed() {
            let after = self.config.ws.handshake_timeout;
            let signals = self.signals_tx.clone();
            self.handshake_timer.arm(move |generation| async move {
                sleep(after).await;
                _ = signals.send(Signal::HandshakeTimedOut { generation });
            });
        }

        let url = self.endpoint();
        let config = Arc::clone(&self.config);
        let signals = self.signals_tx.clone();

        #[cfg(feature = "tracing")]
        tracing::debug!(%url, proxy = ?config.proxy, "opening gateway transport");

        self.opening.arm(move |generation| async move {
            let result = transport::open(&url, config.proxy.as_ref(), &config.user_agent).await;
            _ = signals.send(Signal::Opened {
                generation,
                result: Box::new(result),
            });
        });
    }

    /// Ask the reconnect policy for the next attempt and arm the reconnect timer.
    ///
    /// A no-op while a reconnect is already scheduled. Remote-requested
    /// (`immediate`) reconnects happen even with `auto_reconnect` off.
    fn schedule_reconnect(&mut self, immediate: bool) {
        if matches!(self.state(), ConnectionState::Reconnecting { .. }) {
            #[cfg(feature = "tracing")]
            tracing::debug!("reconnect already scheduled");
            return;
        }
        let delay = if immediate {
            Duration::ZERO
        } else if !self.config.auto_reconnect {
            self.set_state(ConnectionState::Closed);
            return;
        } else if let Some(delay) = self.policy.next_delay() {
            delay
        } else {
            let error = Arc::new(Error::reconnect_exhausted(self.policy.attempt()));

            #[cfg(feature = "tracing")]
            tracing::error!(attempts = self.policy.attempt(), "giving up reconnecting");

            self.fail_waiters(&error);
            self.publish(Event::Error(error));
            self.set_state(ConnectionState::Closed);
            return;
        };

        let attempt = self.policy.attempt();
        self.set_state(ConnectionState::Reconnecting { attempt, delay });

        #[cfg(feature = "tracing")]
        tracing::info!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "reconnect scheduled"
        );

        let signals = self.signals_tx.clone();
        self.reconnect_timer.arm(move |generation| async move {
            sleep(delay).await;
            _ = signals.send(Signal::ReconnectDue { generation });
        });
    }

    /// Close the current transport ourselves, keeping the session resumable.
    fn teardown(&mut self, reason: &str) {
        self.heartbeat.stop();
        self.opening.cancel();

        if let Some(socket) = self.socket.take() {
            retire(socket, WsCloseCode::Restart, self.config.ws.close_timeout);
            self.publish(Event::Closed {
                code: u16::from(WsCloseCode::Restart),
                reason: reason.to_owned(),
            });
        }
    }

    /// The transport was closed by the remote or failed.
    fn transport_closed(&mut self, code: u16, reason: String) {
        self.heartbeat.stop();
        if let Some(socket) = self.socket.take() {
            retire(socket, WsCloseCode::Normal, self.config.ws.close_timeout);
        }

        let disposition = classify(code);

        #[cfg(feature = "tracing")]
        match disposition {
            Disposition::Fatal => tracing::error!(code, %reason, "gateway closed, not reconnecting"),
            _ => tracing::warn!(code, %reason, ?disposition, "gateway closed"),
        }

        self.publish(Event::Closed {
            code,
            reason: reason.clone(),
        });

        match disposition {
            Disposition::Fatal => {
                self.stop_timers();
                let error = Arc::new(Error::fatal_close(code, reason));
                self.fail_waiters(&error);
                self.publish(Event::Error(error));
                self.set_state(ConnectionState::Closed);
                return;
            }
            Disposition::Identify => {
                self.session.clear();
                self.publish_session();
            }
            Disposition::Resume => {}
        }

        self.handshake_timer.cancel();
        if !self.waiters.is_empty() {
            let error: Error = WsError::ConnectionClosed {
                code: Some(code),
                reason,
            }
            .into();
            self.fail_waiters(&Arc::new(error));
        }

        self.schedule_reconnect(false);
    }

    async fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Opened { generation, result } => {
                if !self.opening.fired(generation) {
                    if let Ok(socket) = *result {
                        retire(socket, WsCloseCode::Away, self.config.ws.close_timeout);
                    }
                    return;
                }
                self.opened(*result);
            }
            Signal::HeartbeatDue { generation } => {
                if self.heartbeat.is_current(generation) && self.socket.is_some() {
                    self.heartbeat_due().await;
                }
            }
            Signal::ReconnectDue { generation } => {
                if self.reconnect_timer.fired(generation)
                    && matches!(self.state(), ConnectionState::Reconnecting { .. })
                {
                    self.start_open();
                }
            }
            Signal::HandshakeTimedOut { generation } => {
                if self.handshake_timer.fired(generation) {
                    self.handshake_timed_out();
                }
            }
        }
    }

    fn opened(&mut self, result: Result<WsStream>) {
        match result {
            Ok(socket) => {
                self.socket = Some(socket);
                self.set_state(ConnectionState::AwaitingHello);
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "unable to open gateway transport");

                self.handshake_timer.cancel();
                let error = Arc::new(e);
                self.fail_waiters(&error);
                self.publish(Event::Error(error));
                self.schedule_reconnect(false);
            }
        }
    }

    fn handshake_timed_out(&mut self) {
        let after = self.config.ws.handshake_timeout;
        let error = Arc::new(Error::handshake_timeout(after));
        self.fail_waiters(&error);

        if !self.state().is_handshaking() {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(timeout = ?after, state = ?self.state(), "gateway handshake timed out");

        self.teardown("handshake timeout");
        self.publish(Event::Error(error));
        self.schedule_reconnect(false);
    }

    async fn heartbeat_due(&mut self) {
        match self.heartbeat.due() {
            Beat::Send => self.send_heartbeat().await,
            Beat::Zombie { missed } => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    missed,
                    interval = ?self.heartbeat.interval(),
                    "heartbeats not acknowledged, reconnecting"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = missed;

                self.teardown("heartbeat not acknowledged");
                self.schedule_reconnect(false);
            }
        }
    }

    async fn handle_inbound(&mut self, inbound: Option<tungstenite::Result<Message>>) {
        match inbound {
            Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()).await,
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = frame.map_or((1005, String::new()), |frame| {
                    (u16::from(frame.code), frame.reason.as_str().to_owned())
                });
                self.transport_closed(code, reason);
            }
            Some(Ok(Message::Binary(bytes))) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(len = bytes.len(), "ignoring binary gateway frame");
                #[cfg(not(feature = "tracing"))]
                let _ = bytes;
            }
            Some(Ok(_)) => {
                // Ping/pong are answered by tungstenite.
            }
            Some(Err(e)) => self.transport_closed(ABNORMAL_CLOSURE, e.to_string()),
            None => self.transport_closed(ABNORMAL_CLOSURE, "connection reset".to_owned()),
        }
    }

    async fn handle_text(&mut self, text: &str) {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%text, error = %e, "dropping undecodable gateway frame");
                #[cfg(not(feature = "tracing"))]
                let _ = (&text, &e);
                return;
            }
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(op = %frame.op, seq = ?frame.s, event = ?frame.t, "gateway frame");

        if let Some(sequence) = frame.s {
            self.session.observe(sequence);
            self.publish_session();
        }

        match frame.op {
            OpCode::Hello => self.on_hello(&frame).await,
            OpCode::HeartbeatAck => {
                self.heartbeat.acked();
                self.session.heartbeat_acked(Instant::now());
                self.publish_session();
            }
            OpCode::Heartbeat => self.send_heartbeat().await,
            OpCode::InvalidSession => self.on_invalid_session(frame.is_resumable()).await,
            OpCode::Dispatch => self.on_dispatch(frame),
            OpCode::Reconnect => {
                #[cfg(feature = "tracing")]
                tracing::info!("remote requested reconnect");

                self.teardown("reconnect requested");
                self.schedule_reconnect(true);
            }
            other => {
                #[cfg(feature = "tracing")]
                tracing::debug!(op = %other, "ignoring client-only opcode");
                #[cfg(not(feature = "tracing"))]
                let _ = other;
            }
        }
    }

    async fn on_hello(&mut self, frame: &Frame) {
        let interval = match heartbeat_interval(frame) {
            Ok(interval) => interval,
            Err(e) => {
                self.protocol_violation(e);
                return;
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(heartbeat_interval = ?interval, "hello");

        self.heartbeat.start(interval, self.signals_tx.clone());
        self.send_handshake().await;
    }

    /// The remote broke the handshake protocol: drop the transport and go
    /// through the reconnect policy.
    fn protocol_violation(&mut self, error: Error) {
        #[cfg(feature = "tracing")]
        tracing::warn!(%error, "gateway protocol violation");

        let error = Arc::new(error);
        self.handshake_timer.cancel();
        self.fail_waiters(&error);
        self.teardown("protocol violation");
        self.publish(Event::Error(error));
        self.schedule_reconnect(false);
    }

    /// Resume when a session id is held, otherwise Identify.
    async fn send_handshake(&mut self) {
        let frame = match self.session.session_id.as_deref() {
            Some(session_id) => {
                let sequence = self.session.sequence.unwrap_or_default();

                #[cfg(feature = "tracing")]
                tracing::debug!(session_id, seq = sequence, "resuming session");

                let frame = Frame::resume(&self.handshake.token, session_id, sequence);
                self.set_state(ConnectionState::Resuming);
                frame
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!(intents = %self.handshake.intents, "identifying");

                let frame = Frame::identify(
                    &self.handshake.token,
                    self.handshake.intents,
                    &self.handshake.properties,
                );
                self.set_state(ConnectionState::Identifying);
                frame
            }
        };

        match frame {
            Ok(frame) => {
                self.send(&frame).await;
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %e, "unable to encode handshake");
                #[cfg(not(feature = "tracing"))]
                let _ = e;
            }
        }
    }

    async fn on_invalid_session(&mut self, resumable: bool) {
        #[cfg(feature = "tracing")]
        tracing::info!(resumable, "session invalidated");

        if resumable && self.session.can_resume() {
            self.teardown("invalid session, resuming");
            self.schedule_reconnect(true);
        } else {
            self.session.clear();
            self.publish_session();
            self.send_handshake().await;
        }
    }

    fn on_dispatch(&mut self, frame: Frame) {
        let Some(name) = frame.t.as_deref() else {
            #[cfg(feature = "tracing")]
            tracing::warn!("dispatch frame without an event name");
            return;
        };

        match name {
            "READY" => {
                let Some(session_id) = frame.d.get("session_id").and_then(|v| v.as_str()) else {
                    self.protocol_violation(Error::protocol("READY without a session id"));
                    return;
                };
                self.session.session_id = Some(session_id.to_owned());
                self.session.resume_gateway_url = frame
                    .d
                    .get("resume_gateway_url")
                    .and_then(|v| v.as_str())
                    .map(str::to_owned);
                self.handshake_complete();
            }
            "RESUMED" => self.handshake_complete(),
            _ => {}
        }

        match Event::from_dispatch(name, frame.d) {
            Ok(Some(event)) => self.publish(event),
            Ok(None) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(event = name, "ignoring untranslated dispatch");
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(event = name, error = %e, "dropping undecodable dispatch");
                #[cfg(not(feature = "tracing"))]
                let _ = e;
            }
        }
    }

    fn handshake_complete(&mut self) {
        let now = Instant::now();
        self.handshake_timer.cancel();
        self.policy.reset();
        self.session.connected_since = Some(now);
        self.publish_session();
        self.set_state(ConnectionState::Ready { since: now });

        #[cfg(feature = "tracing")]
        tracing::info!(
            session_id = ?self.session.session_id,
            seq = ?self.session.sequence,
            "gateway ready"
        );

        for waiter in self.waiters.drain(..) {
            _ = waiter.send(Ok(()));
        }
    }

    async fn send_heartbeat(&mut self) {
        let frame = Frame::heartbeat(self.session.sequence);
        if self.send(&frame).await {
            self.session.heartbeat_sent(Instant::now());
            self.publish_session();

            #[cfg(feature = "tracing")]
            tracing::debug!(seq = ?self.session.sequence, "heartbeat sent");
        }
    }

    /// Write one frame. A failed write is handled as a transport failure.
    async fn send(&mut self, frame: &Frame) -> bool {
        let Some(socket) = self.socket.as_mut() else {
            return false;
        };
        let text = match frame.encode() {
            Ok(text) => text,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::error!(op = %frame.op, error = %e, "unable to encode frame");
                #[cfg(not(feature = "tracing"))]
                let _ = e;
                return false;
            }
        };

        match socket.send(Message::Text(text.into())).await {
            Ok(()) => true,
            Err(e) => {
                self.transport_closed(ABNORMAL_CLOSURE, e.to_string());
                false
            }
        }
    }
}

/// Heartbeat interval announced by Hello, if it is usable.
fn heartbeat_interval(hello: &Frame) -> Result<Duration> {
    match hello.heartbeat_interval().map(Duration::from_millis) {
        Some(interval) if !interval.is_zero() && interval <= MAX_HEARTBEAT_INTERVAL => Ok(interval),
        _ => Err(Error::protocol(format!(
            "Hello with an unusable heartbeat interval: {}",
            hello.d
        ))),
    }
}

async fn next_message(socket: &mut Option<WsStream>) -> Option<tungstenite::Result<Message>> {
    match socket {
        Some(socket) => socket.next().await,
        None => std::future::pending().await,
    }
}

/// Finish closing a socket the driver no longer reads, off the driver task.
fn retire(mut socket: WsStream, code: WsCloseCode, close_timeout: Duration) {
    tokio::spawn(async move {
        let closing = async {
            let frame = CloseFrame {
                code,
                reason: "".into(),
            };
            if socket.close(Some(frame)).await.is_ok() {
                while let Some(Ok(_)) = socket.next().await {}
            }
        };
        _ = timeout(close_timeout, closing).await;
    });
}

use std::sync::Arc;

use async_stream::stream;
use bon::Builder;
use futures::Stream;
use secrecy::{ExposeSecret as _, SecretString};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::{CancellationToken, DropGuard};
use url::Url;

use super::dispatcher::{Dispatcher, HandlerId};
use super::events::{Event, EventKind};
use super::frame::ConnectionProperties;
use super::intents::Intents;
use super::session::Session;
use crate::Result;
use crate::error::{Error, Kind};
use crate::ws::config::Config;
use crate::ws::connection::{Command, ConnectionState, Driver, DriverConfig, Outputs};
use crate::ws::error::WsError;
use crate::ws::proxy::ProxyConfig;

const BROADCAST_CAPACITY: usize = 1024;

/// Identity presented to the gateway in Identify and Resume.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct HandshakeConfig {
    /// Bot token
    #[builder(into)]
    pub token: SecretString,
    /// Event categories to receive
    pub intents: Intents,
    #[builder(default)]
    pub properties: ConnectionProperties,
}

impl HandshakeConfig {
    fn validate(&self) -> Result<()> {
        if self.token.expose_secret().trim().is_empty() {
            return Err(Error::validation("token must not be empty"));
        }
        if self.intents.is_empty() {
            return Err(Error::validation("at least one intent is required"));
        }
        Ok(())
    }
}

/// Everything needed to build a [`Client`].
///
/// ```rust
/// use discord_gateway_sdk::gateway::{ClientConfig, HandshakeConfig, Intents};
///
/// let config = ClientConfig::builder()
///     .handshake(
///         HandshakeConfig::builder()
///             .token("my-token")
///             .intents(Intents::GUILDS | Intents::GUILD_MESSAGES)
///             .build(),
///     )
///     .auto_reconnect(false)
///     .build();
///
/// assert_eq!(config.gateway_url, discord_gateway_sdk::GATEWAY_URL);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct ClientConfig {
    pub handshake: HandshakeConfig,
    /// Gateway endpoint, including the `v` and `encoding` query
    #[builder(into, default = crate::GATEWAY_URL.to_owned())]
    pub gateway_url: String,
    /// Forward proxy URL. When absent, [`PROXY_VAR`](crate::PROXY_VAR) is consulted.
    #[builder(into)]
    pub proxy: Option<String>,
    /// Sent as the `User-Agent` header of the upgrade request
    #[builder(into, default = crate::USER_AGENT.to_owned())]
    pub user_agent: String,
    /// Reconnect on its own after resumable closes. Reconnects requested by
    /// the remote happen either way.
    #[builder(default = true)]
    pub auto_reconnect: bool,
    #[builder(default)]
    pub ws: Config,
}

/// A gateway client: one logical connection to the gateway.
///
/// All protocol work happens on a background task spawned by [`Client::new`];
/// the client only sends it commands and observes its state. Clones share the
/// same connection. The background task stops once every clone is dropped.
///
/// # Examples
///
/// ```rust, no_run
/// use discord_gateway_sdk::gateway::{Client, ClientConfig, EventKind, HandshakeConfig, Intents};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let handshake = HandshakeConfig::builder()
///         .token(std::env::var("DISCORD_TOKEN")?)
///         .intents(Intents::GUILDS | Intents::GUILD_MESSAGES)
///         .build();
///     let client = Client::new(ClientConfig::builder().handshake(handshake).build())?;
///
///     client.on(EventKind::MessageCreate, |event| println!("{event:?}"));
///     client.connect().await?;
///
///     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
///     client.disconnect().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    session: watch::Receiver<Session>,
    dispatcher: Arc<Dispatcher>,
    events: broadcast::Sender<Event>,
    /// Stops the driver when the last clone goes away
    _shutdown: DropGuard,
}

impl Client {
    /// Validate `config` and spawn the connection driver on the current Tokio
    /// runtime. Does not connect.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.handshake.validate()?;
        config.ws.validate()?;

        let gateway_url = Url::parse(&config.gateway_url)?;
        if !matches!(gateway_url.scheme(), "ws" | "wss") {
            return Err(Error::validation(format!(
                "gateway URL must use ws or wss, got `{}`",
                gateway_url.scheme()
            )));
        }
        let proxy = ProxyConfig::resolve(config.proxy.as_deref())?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::with_source(Kind::Validation, e))?;

        #[cfg(feature = "tracing")]
        if config.handshake.intents.is_privileged() {
            tracing::debug!(
                intents = %config.handshake.intents,
                "privileged intents requested, the application must have them enabled"
            );
        }

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Idle);
        let (session_tx, session) = watch::channel(Session::default());
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);
        let dispatcher = Arc::new(Dispatcher::new());
        let shutdown = CancellationToken::new();

        let driver = Driver::new(
            DriverConfig {
                gateway_url,
                proxy,
                user_agent: config.user_agent,
                auto_reconnect: config.auto_reconnect,
                ws: config.ws,
            },
            config.handshake,
            Outputs {
                state: state_tx,
                session: session_tx,
                dispatcher: Arc::clone(&dispatcher),
                events: events.clone(),
            },
            commands_rx,
            shutdown.clone(),
        )?;
        runtime.spawn(driver.run());

        Ok(Self {
            inner: Arc::new(ClientInner {
                commands,
                state,
                session,
                dispatcher,
                events,
                _shutdown: shutdown.drop_guard(),
            }),
        })
    }

    fn command(&self, command: Command) -> Result<()> {
        self.inner
            .commands
            .send(command)
            .map_err(|_closed| Error::aborted())
    }

    /// Open the gateway and wait until the handshake reaches `Ready`.
    ///
    /// Resolves immediately when already connected, and joins the attempt in
    /// flight when one is. Fails with [`Kind::Timeout`] after the configured
    /// handshake timeout, [`Kind::Fatal`] on an unrecoverable close,
    /// [`Kind::Aborted`] when [`Client::disconnect`] interrupts it, or
    /// [`Kind::Transport`] when the transport fails before `Ready`.
    pub async fn connect(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Connect(tx))?;
        match rx.await {
            Ok(result) => result,
            Err(_closed) => Err(Error::aborted()),
        }
    }

    /// Close the gateway with "going away", cancel every timer and pending
    /// reconnect, and wait for the remote to acknowledge the close.
    ///
    /// Idempotent. The session is kept, so a later [`Client::connect`] resumes.
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self.command(Command::Disconnect(tx)).is_ok() {
            _ = rx.await;
        }
    }

    /// [`Client::disconnect`] followed by [`Client::connect`], skipping any backoff.
    pub async fn reconnect(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Reconnect(tx))?;
        match rx.await {
            Ok(result) => result,
            Err(_closed) => Err(Error::aborted()),
        }
    }

    /// Replace the token, intents or client properties. The session is
    /// cleared, so the next handshake identifies from scratch.
    pub fn set_handshake(&self, handshake: HandshakeConfig) -> Result<()> {
        handshake.validate()?;
        self.command(Command::SetHandshake(handshake))
    }

    /// Register `handler` for every event of `kind`.
    ///
    /// Handlers run on the connection task: keep them short. A panicking
    /// handler is logged and does not affect other handlers.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe(kind, handler)
    }

    /// Remove a handler registered with [`Client::on`]. Returns `false` if it
    /// was already removed.
    pub fn off(&self, id: HandlerId) -> bool {
        self.inner.dispatcher.unsubscribe(id)
    }

    /// Every event published from now on, independent of registered handlers.
    ///
    /// A consumer that falls behind by more than the channel capacity gets one
    /// [`WsError::Lagged`] item and then continues with newer events.
    pub fn events(&self) -> impl Stream<Item = Result<Event>> + use<> {
        let mut rx = self.inner.events.subscribe();

        stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield Ok(event),
                    Err(RecvError::Lagged(count)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("gateway event stream lagged, missed {count} events");
                        yield Err(WsError::Lagged { count }.into());
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    /// `true` only once the handshake has completed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.clone()
    }

    /// Snapshot of the resumption bookkeeping.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.session.borrow().clone()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .field("dispatcher", &self.inner.dispatcher)
            .finish_non_exhaustive()
    }
}

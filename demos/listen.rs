//! Connects to the gateway and logs every event for a while.
//!
//! ```sh
//! DISCORD_TOKEN=... RUST_LOG=info,discord_gateway_sdk=debug cargo run --example listen
//! ```
//!
//! Set `DISCORD_PROXY` (e.g. `socks5://127.0.0.1:1080`) to tunnel through a proxy.

use std::time::Duration;

use discord_gateway_sdk::gateway::{Client, ClientConfig, Event, EventKind, HandshakeConfig, Intents};
use futures::StreamExt as _;
use tokio::time::timeout;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let intents = std::env::var("DISCORD_INTENTS")
        .ok()
        .map(|raw| raw.parse::<Intents>())
        .transpose()?
        .unwrap_or(Intents::GUILDS | Intents::GUILD_MESSAGES);
    let handshake = HandshakeConfig::builder()
        .token(std::env::var("DISCORD_TOKEN")?)
        .intents(intents)
        .build();
    let client = Client::new(ClientConfig::builder().handshake(handshake).build())?;

    client.on(EventKind::Ready, |event| {
        if let Event::Ready(ready) = event {
            info!(
                user = %ready.user.username,
                guilds = ready.guilds.len(),
                session_id = %ready.session_id,
                "ready"
            );
        }
    });
    client.on(EventKind::Closed, |event| {
        if let Event::Closed { code, reason } = event {
            warn!(code, %reason, "gateway closed");
        }
    });

    let mut events = Box::pin(client.events());
    client.connect().await?;

    while let Ok(Some(event)) = timeout(Duration::from_secs(120), events.next()).await {
        match event {
            Ok(Event::MessageCreate(message)) => info!(
                channel = %message.channel_id,
                author = %message.author.username,
                content = %message.content,
                "message"
            ),
            Ok(Event::GuildCreate(guild)) => info!(guild = %guild.name, "guild available"),
            Ok(Event::Error(error)) => warn!(%error, "gateway error"),
            Ok(other) => info!(kind = %other.kind(), state = ?client.state()),
            Err(e) => warn!(error = %e, "event stream"),
        }
    }

    client.disconnect().await;
    info!(session = ?client.session(), "disconnected");
    Ok(())
}

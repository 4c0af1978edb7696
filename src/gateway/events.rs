use std::sync::Arc;

use phf::phf_map;
use serde_json::Value;

use crate::Result;
use crate::error::Error;
use crate::serde_helpers::deserialize_payload;
use crate::types::{Channel, Guild, Message, Ready, UnavailableGuild};

/// Event categories subscribers register for.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Ready,
    Resumed,
    MessageCreate,
    GuildCreate,
    GuildDelete,
    ChannelCreate,
    ChannelDelete,
    Error,
    Closed,
}

/// Dispatch event names the client translates. Every other name is ignored.
static DISPATCH_KINDS: phf::Map<&'static str, EventKind> = phf_map! {
    "READY" => EventKind::Ready,
    "RESUMED" => EventKind::Resumed,
    "MESSAGE_CREATE" => EventKind::MessageCreate,
    "GUILD_CREATE" => EventKind::GuildCreate,
    "GUILD_DELETE" => EventKind::GuildDelete,
    "CHANNEL_CREATE" => EventKind::ChannelCreate,
    "CHANNEL_DELETE" => EventKind::ChannelDelete,
};

impl EventKind {
    /// Kind for a dispatch event name, `None` for names this client ignores.
    #[must_use]
    pub fn from_dispatch(name: &str) -> Option<Self> {
        DISPATCH_KINDS.get(name).copied()
    }
}

/// A published event with its typed payload.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum Event {
    /// Identify handshake completed
    Ready(Box<Ready>),
    /// Resume handshake completed, missed events are being replayed
    Resumed,
    MessageCreate(Box<Message>),
    GuildCreate(Box<Guild>),
    GuildDelete(UnavailableGuild),
    ChannelCreate(Box<Channel>),
    ChannelDelete(Box<Channel>),
    /// Something went wrong that the application should know about
    Error(Arc<Error>),
    /// The transport closed. `1006` stands in when no close frame was received.
    Closed { code: u16, reason: String },
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::Resumed => EventKind::Resumed,
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::GuildCreate(_) => EventKind::GuildCreate,
            Self::GuildDelete(_) => EventKind::GuildDelete,
            Self::ChannelCreate(_) => EventKind::ChannelCreate,
            Self::ChannelDelete(_) => EventKind::ChannelDelete,
            Self::Error(_) => EventKind::Error,
            Self::Closed { .. } => EventKind::Closed,
        }
    }

    /// Decode the payload of a dispatch frame.
    ///
    /// Returns `Ok(None)` for dispatch names this client does not translate.
    pub fn from_dispatch(name: &str, data: Value) -> Result<Option<Self>> {
        let Some(kind) = EventKind::from_dispatch(name) else {
            return Ok(None);
        };

        let event = match kind {
            EventKind::Ready => Self::Ready(Box::new(deserialize_payload(data)?)),
            EventKind::Resumed => Self::Resumed,
            EventKind::MessageCreate => Self::MessageCreate(Box::new(deserialize_payload(data)?)),
            EventKind::GuildCreate => Self::GuildCreate(Box::new(deserialize_payload(data)?)),
            EventKind::GuildDelete => Self::GuildDelete(deserialize_payload(data)?),
            EventKind::ChannelCreate => Self::ChannelCreate(Box::new(deserialize_payload(data)?)),
            EventKind::ChannelDelete => Self::ChannelDelete(Box::new(deserialize_payload(data)?)),
            EventKind::Error | EventKind::Closed => return Ok(None),
        };

        Ok(Some(event))
    }
}

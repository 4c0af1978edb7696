//! Typed payloads of the dispatch events this client publishes.
//!
//! Only the fields a consuming application commonly needs are modelled.
//! Anything else the remote sends is ignored (and reported at `debug` level
//! when the `tracing` feature is enabled).

use std::fmt;
use std::str::FromStr;

use bon::Builder;
use serde::Deserialize;
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Date and time types for timestamps in event payloads.
pub use chrono::{DateTime, Utc};

/// Remote object identifier, sent on the wire as a decimal string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Milliseconds since the remote's epoch (2015-01-01T00:00:00Z) encoded in the id.
    const EPOCH_MS: i64 = 1_420_070_400_000;

    /// Creation time embedded in the upper bits of the id.
    #[must_use]
    pub fn created_at(self) -> Option<DateTime<Utc>> {
        let offset = i64::try_from(self.0 >> 22).ok()?;
        DateTime::from_timestamp_millis(Self::EPOCH_MS.checked_add(offset)?)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub bot: bool,
    #[serde(default)]
    #[builder(default)]
    pub system: bool,
}

/// Guild stub sent in `READY` and `GUILD_DELETE`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    /// `false` or absent in `GUILD_DELETE` means the client was removed from the guild
    #[serde(default)]
    #[builder(default)]
    pub unavailable: bool,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preferred_locale: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub member_count: Option<u64>,
    #[serde(default)]
    #[builder(default)]
    pub channels: Vec<Channel>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
pub struct Channel {
    pub id: Snowflake,
    /// Numeric channel type (0 text, 1 DM, 2 voice, ...)
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    #[builder(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub last_message_id: Option<Snowflake>,
    #[serde(default)]
    #[builder(default)]
    pub recipients: Vec<User>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    pub size: u64,
    pub url: String,
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
pub struct MessageReference {
    #[serde(default)]
    pub message_id: Option<Snowflake>,
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub author: User,
    /// Empty unless the `MESSAGE_CONTENT` intent is granted
    #[serde(default)]
    #[builder(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    #[builder(default)]
    pub tts: bool,
    #[serde(default)]
    #[builder(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    #[builder(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    #[builder(default)]
    pub mention_roles: Vec<Snowflake>,
    #[serde(default)]
    #[builder(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    #[builder(default)]
    pub pinned: bool,
    #[serde(default)]
    pub webhook_id: Option<Snowflake>,
    #[serde(rename = "type", default)]
    #[builder(default)]
    pub kind: u8,
    #[serde(default)]
    pub message_reference: Option<MessageReference>,
    #[serde(default)]
    pub flags: Option<u64>,
}

/// Payload of the `READY` dispatch that completes an Identify handshake.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
pub struct Ready {
    /// Gateway protocol version, `0` when the remote omits it
    #[serde(rename = "v", default)]
    #[builder(default)]
    pub version: u8,
    pub user: User,
    #[serde(default)]
    #[builder(default)]
    pub guilds: Vec<UnavailableGuild>,
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

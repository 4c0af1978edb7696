use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

bitflags! {
    /// Gateway intents: each bit enables one category of events the remote delivers.
    ///
    /// Bit positions are fixed by the remote protocol. A missing bit does not
    /// error, it silently suppresses every event in that category.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u32 {
        const GUILDS = 1;
        /// Privileged.
        const GUILD_MEMBERS = 1 << 1;
        const GUILD_BANS = 1 << 2;
        const GUILD_EMOJIS_AND_STICKERS = 1 << 3;
        const GUILD_INTEGRATIONS = 1 << 4;
        const GUILD_WEBHOOKS = 1 << 5;
        const GUILD_INVITES = 1 << 6;
        const GUILD_VOICE_STATES = 1 << 7;
        /// Privileged.
        const GUILD_PRESENCES = 1 << 8;
        const GUILD_MESSAGES = 1 << 9;
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        const GUILD_MESSAGE_TYPING = 1 << 11;
        const DIRECT_MESSAGES = 1 << 12;
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        const DIRECT_MESSAGE_TYPING = 1 << 14;
        /// Privileged.
        const MESSAGE_CONTENT = 1 << 15;
        const GUILD_SCHEDULED_EVENTS = 1 << 16;
        const AUTO_MODERATION_CONFIGURATION = 1 << 20;
        const AUTO_MODERATION_EXECUTION = 1 << 21;

        /// Intents that must be enabled for the application before the remote accepts them.
        const PRIVILEGED = Self::GUILD_MEMBERS.bits()
            | Self::GUILD_PRESENCES.bits()
            | Self::MESSAGE_CONTENT.bits();
    }
}

impl Intents {
    /// Combine named flags into a bitmask.
    pub fn encode<'a, I>(names: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().try_fold(Self::empty(), |acc, name| {
            let name = name.trim();
            Self::from_name(name)
                .map(|flag| acc | flag)
                .ok_or_else(|| Error::validation(format!("unknown intent `{name}`")))
        })
    }

    /// Names of the single-bit flags set in this mask, for diagnostics.
    ///
    /// Unknown bits are ignored.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names()
            .filter(|(_, flag)| flag.bits().is_power_of_two())
            .map(|(name, _)| name)
            .collect()
    }

    /// Whether any privileged intent is requested.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.intersects(Self::PRIVILEGED)
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::GUILD_MESSAGES | Self::DIRECT_MESSAGES | Self::MESSAGE_CONTENT
    }
}

impl fmt::Display for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(" | "))
    }
}

/// Parses `"GUILDS | DIRECT_MESSAGES"`, `"GUILDS,DIRECT_MESSAGES"` or a raw integer.
impl FromStr for Intents {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(bits) = s.trim().parse::<u32>() {
            return Ok(Self::from_bits_truncate(bits));
        }
        Self::encode(s.split(['|', ',']).filter(|part| !part.trim().is_empty()))
    }
}

// The wire format is the integer mask, not the bitflags name list.
impl Serialize for Intents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from_bits_truncate)
    }
}

#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod error;
pub mod gateway;
pub(crate) mod serde_helpers;
pub mod types;
pub mod ws;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Default gateway endpoint: API v10, JSON encoding.
pub const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Default `User-Agent` of the upgrade request.
pub const USER_AGENT: &str = concat!(
    "DiscordBot (",
    env!("CARGO_PKG_NAME"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Environment variable consulted for a forward proxy URL when none is configured.
pub const PROXY_VAR: &str = "DISCORD_PROXY";

//! Socket infrastructure underneath the gateway protocol.
//!
//! # Architecture
//!
//! - [`connection`]: the lifecycle driver task and the public [`ConnectionState`]
//! - `transport`: opens the WebSocket, directly or through a [`ProxyConfig`]
//! - [`ReconnectPolicy`]: exponential backoff with jitter and a ceiling
//! - heartbeat and timer helpers owned by the driver
//!
//! Only the driver task mutates connection state. Timers run as separate tasks
//! and report back over a channel, each tagged with the generation it was
//! armed with so a cancelled timer can never act.

pub mod backoff;
pub mod config;
pub mod connection;
pub mod error;
pub(crate) mod heartbeat;
pub mod proxy;
pub(crate) mod timer;
pub(crate) mod transport;

pub use backoff::ReconnectPolicy;
pub use config::{Config, ReconnectConfig};
pub use connection::ConnectionState;
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use proxy::{ProxyConfig, ProxyScheme};

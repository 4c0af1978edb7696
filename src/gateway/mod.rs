//! Gateway protocol: frames, handshake identity, session bookkeeping, events
//! and the public [`Client`].
//!
//! # Architecture
//!
//! - [`Client`]: one logical gateway connection, driven by a background task
//! - [`Frame`]: the `{op, d, s, t}` wire envelope and the frames this client sends
//! - [`Session`]: what a Resume needs (session id, highest sequence)
//! - [`Dispatcher`]: per-kind handler registry behind [`Client::on`]
//! - [`Registry`]: one client per account, owned by the application

pub mod client;
pub mod close_code;
pub mod dispatcher;
pub mod events;
pub mod frame;
pub mod intents;
pub mod registry;
pub mod session;

pub use client::{Client, ClientConfig, HandshakeConfig};
pub use close_code::{CloseCode, Disposition};
pub use dispatcher::{Dispatcher, HandlerId};
pub use events::{Event, EventKind};
pub use frame::{ConnectionProperties, Frame, OpCode};
pub use intents::Intents;
pub use registry::Registry;
pub use session::Session;

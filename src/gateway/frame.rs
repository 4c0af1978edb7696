//! Gateway wire envelope `{op, d, s, t}` and the outbound frames this client sends.
//!
//! Encoding and decoding are pure: nothing here touches the socket or the
//! session.

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::intents::Intents;
use crate::Result;
use crate::ws::WsError;

/// Gateway opcodes.
#[non_exhaustive]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr, strum_macros::Display,
)]
#[repr(u8)]
pub enum OpCode {
    /// An event was dispatched
    Dispatch = 0,
    /// Keep-alive, sent by the client on schedule or requested by the remote
    Heartbeat = 1,
    /// Start a new session
    Identify = 2,
    PresenceUpdate = 3,
    VoiceStateUpdate = 4,
    /// Re-attach to a previous session
    Resume = 6,
    /// The remote asks the client to reconnect and resume
    Reconnect = 7,
    RequestGuildMembers = 8,
    /// The session was invalidated; `d` tells whether it is resumable
    InvalidSession = 9,
    /// First frame after connecting, carries the heartbeat interval
    Hello = 10,
    /// Heartbeat acknowledged
    HeartbeatAck = 11,
}

/// One gateway frame.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub op: OpCode,
    #[serde(default)]
    pub d: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl Frame {
    #[must_use]
    pub fn new(op: OpCode, d: Value) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    #[must_use]
    pub fn dispatch(event: &str, sequence: u64, d: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            d,
            s: Some(sequence),
            t: Some(event.to_owned()),
        }
    }

    /// Decode a single text frame.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| WsError::MessageParse(e).into())
    }

    /// Encode to the JSON text sent over the socket.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Heartbeat carrying the last observed sequence (`null` before any dispatch).
    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self::new(OpCode::Heartbeat, sequence.map_or(Value::Null, Value::from))
    }

    pub fn identify(
        token: &SecretString,
        intents: Intents,
        properties: &ConnectionProperties,
    ) -> Result<Self> {
        let identify = Identify {
            token: token.expose_secret(),
            properties,
            intents,
        };
        Ok(Self::new(OpCode::Identify, serde_json::to_value(identify)?))
    }

    pub fn resume(token: &SecretString, session_id: &str, seq: u64) -> Result<Self> {
        let resume = Resume {
            token: token.expose_secret(),
            session_id,
            seq,
        };
        Ok(Self::new(OpCode::Resume, serde_json::to_value(resume)?))
    }

    /// Heartbeat interval announced by a Hello frame.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<u64> {
        self.d.get("heartbeat_interval").and_then(Value::as_u64)
    }

    /// Whether an InvalidSession frame says the session can be resumed.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.d.as_bool().unwrap_or(false)
    }
}

/// Client identification sent in Identify.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl ConnectionProperties {
    #[must_use]
    pub fn new<S: Into<String>>(client_name: S) -> Self {
        let client_name = client_name.into();
        Self {
            os: std::env::consts::OS.to_owned(),
            browser: client_name.clone(),
            device: client_name,
        }
    }
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

#[derive(Serialize)]
struct Identify<'a> {
    token: &'a str,
    properties: &'a ConnectionProperties,
    intents: Intents,
}

#[derive(Serialize)]
struct Resume<'a> {
    token: &'a str,
    session_id: &'a str,
    seq: u64,
}

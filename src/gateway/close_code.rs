use serde_repr::{Deserialize_repr, Serialize_repr};

/// Gateway close codes sent by the remote.
#[non_exhaustive]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize_repr,
    Deserialize_repr,
    strum_macros::Display,
    strum_macros::FromRepr,
)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    NotAuthenticated = 4003,
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    InvalidSequence = 4007,
    RateLimited = 4008,
    SessionTimedOut = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    DisallowedIntents = 4014,
}

/// What the client does after the transport closes with a given code.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Reconnecting cannot help: stay closed.
    Fatal,
    /// Reconnect and resume the current session.
    Resume,
    /// Reconnect, but the session is gone: identify from scratch.
    Identify,
}

impl CloseCode {
    #[must_use]
    pub fn disposition(self) -> Disposition {
        match self {
            Self::AuthenticationFailed | Self::InvalidIntents | Self::DisallowedIntents => {
                Disposition::Fatal
            }
            Self::InvalidSequence | Self::SessionTimedOut => Disposition::Identify,
            _ => Disposition::Resume,
        }
    }
}

/// Classify any close code, including the generic WebSocket ones and codes
/// unknown to this client, which are all resumable.
#[must_use]
pub fn classify(code: u16) -> Disposition {
    CloseCode::from_repr(code).map_or(Disposition::Resume, CloseCode::disposition)
}

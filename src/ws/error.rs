#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

use crate::error::Kind;

/// WebSocket error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// Error connecting to or communicating with the gateway socket
    Connection(tokio_tungstenite::tungstenite::Error),
    /// Error parsing a gateway frame
    MessageParse(serde_json::Error),
    /// The configured forward proxy could not be reached or refused the tunnel
    Proxy(ProxyError),
    /// The gateway socket was closed
    ConnectionClosed {
        /// Close code sent by the remote, if any
        code: Option<u16>,
        /// Close reason sent by the remote
        reason: String,
    },
    /// Event stream lagged and missed messages
    Lagged {
        /// Number of messages that were missed
        count: u64,
    },
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "WebSocket connection error: {e}"),
            Self::MessageParse(e) => write!(f, "Failed to parse gateway frame: {e}"),
            Self::Proxy(e) => write!(f, "Proxy error: {e}"),
            Self::ConnectionClosed { code: Some(code), reason } => {
                write!(f, "WebSocket connection closed ({code}): {reason}")
            }
            Self::ConnectionClosed { code: None, .. } => write!(f, "WebSocket connection closed"),
            Self::Lagged { count } => write!(f, "Event stream lagged, missed {count} messages"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::MessageParse(e) => Some(e),
            Self::Proxy(e) => Some(e),
            _ => None,
        }
    }
}

/// A configured proxy failed. Never silently bypassed.
#[non_exhaustive]
#[derive(Debug)]
pub struct ProxyError {
    /// Proxy URL with credentials redacted
    pub proxy: String,
    /// What went wrong
    pub reason: String,
}

impl ProxyError {
    pub(crate) fn new<S: Into<String>>(proxy: &url::Url, reason: S) -> Self {
        let mut redacted = proxy.clone();
        if !redacted.username().is_empty() {
            _ = redacted.set_username("***");
        }
        if redacted.password().is_some() {
            _ = redacted.set_password(Some("***"));
        }
        Self {
            proxy: redacted.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {}", self.reason, self.proxy)
    }
}

impl StdError for ProxyError {}

impl WsError {
    /// Classify this socket error into the crate error taxonomy.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::MessageParse(_) => Kind::Decode,
            Self::Lagged { .. } => Kind::Internal,
            Self::Connection(_) | Self::Proxy(_) | Self::ConnectionClosed { .. } => {
                Kind::Transport
            }
        }
    }
}

// Integration with main Error type
impl From<WsError> for crate::error::Error {
    fn from(e: WsError) -> Self {
        let kind = e.kind();
        crate::error::Error::with_source(kind, e)
    }
}

impl From<ProxyError> for crate::error::Error {
    fn from(e: ProxyError) -> Self {
        WsError::Proxy(e).into()
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for crate::error::Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        crate::error::Error::with_source(Kind::Transport, WsError::Connection(e))
    }
}

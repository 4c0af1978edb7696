use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Error opening or talking to the gateway socket (refused, reset, proxy failure)
    Transport,
    /// A single inbound frame or payload could not be decoded
    Decode,
    /// The remote violated or rejected the handshake protocol
    Protocol,
    /// The remote closed the gateway with a code that forbids reconnecting
    Fatal,
    /// The handshake did not reach `Ready` in time
    Timeout,
    /// The operation was cancelled by a local `disconnect`
    Aborted,
    /// Error related to invalid configuration or arguments
    Validation,
    /// Internal error from dependencies
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        if let Some(shared) = e.downcast_ref::<Shared>() {
            return shared.0.downcast_ref::<E>();
        }
        e.downcast_ref::<E>()
    }

    /// A new error reporting the same failure as `error`, for handing one
    /// failure to several receivers. `kind` and `downcast_ref` see through it.
    #[must_use]
    pub fn shared(error: &Arc<Error>) -> Self {
        Self::with_source(error.kind, Shared(Arc::clone(error)))
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Protocol {
            reason: message.into(),
        }
        .into()
    }

    #[must_use]
    pub fn fatal_close(code: u16, reason: String) -> Self {
        FatalClose { code, reason }.into()
    }

    #[must_use]
    pub fn aborted() -> Self {
        Aborted.into()
    }

    #[must_use]
    pub fn handshake_timeout(after: Duration) -> Self {
        HandshakeTimeout { after }.into()
    }

    #[must_use]
    pub fn reconnect_exhausted(attempts: u32) -> Self {
        ReconnectExhausted { attempts }.into()
    }

    /// Whether this error came from a fatal close code, i.e. reconnecting cannot help.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind == Kind::Fatal
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

#[non_exhaustive]
#[derive(Debug)]
pub struct Protocol {
    pub reason: String,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol violation: {}", self.reason)
    }
}

impl StdError for Protocol {}

/// The gateway was closed with a code that rules out automatic reconnection,
/// e.g. an invalid token or a disallowed intent.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct FatalClose {
    pub code: u16,
    pub reason: String,
}

impl fmt::Display for FatalClose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gateway closed with unrecoverable code {}: {}",
            self.code, self.reason
        )
    }
}

impl StdError for FatalClose {}

#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct Aborted;

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection attempt aborted by disconnect")
    }
}

impl StdError for Aborted {}

#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct HandshakeTimeout {
    pub after: Duration,
}

impl fmt::Display for HandshakeTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gateway handshake did not complete within {:?}", self.after)
    }
}

impl StdError for HandshakeTimeout {}

/// Automatic reconnection gave up after the configured number of attempts.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct ReconnectExhausted {
    pub attempts: u32,
}

impl fmt::Display for ReconnectExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up reconnecting after {} attempts", self.attempts)
    }
}

impl StdError for ReconnectExhausted {}

/// See [`Error::shared`].
#[derive(Debug, Clone)]
pub struct Shared(pub Arc<Error>);

impl fmt::Display for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.inner() {
            Some(inner) => fmt::Display::fmt(inner, f),
            None => write!(f, "{:?}", self.0.kind()),
        }
    }
}

impl StdError for Shared {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<Protocol> for Error {
    fn from(err: Protocol) -> Self {
        Error::with_source(Kind::Protocol, err)
    }
}

impl From<FatalClose> for Error {
    fn from(err: FatalClose) -> Self {
        Error::with_source(Kind::Fatal, err)
    }
}

impl From<Aborted> for Error {
    fn from(err: Aborted) -> Self {
        Error::with_source(Kind::Aborted, err)
    }
}

impl From<HandshakeTimeout> for Error {
    fn from(err: HandshakeTimeout) -> Self {
        Error::with_source(Kind::Timeout, err)
    }
}

impl From<ReconnectExhausted> for Error {
    fn from(err: ReconnectExhausted) -> Self {
        Error::with_source(Kind::Transport, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::Decode, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::with_source(Kind::Transport, e)
    }
}

impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

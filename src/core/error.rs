use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where a transport failure happened, classified once at the transport
/// boundary. Every kind except `Other` is a socket-level condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransportErrorKind {
    ConnectTimeout,
    ReadTimeout,
    NoResponse,
    OtherSocket,
    Other,
}

impl TransportErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectTimeout => "connect_timeout",
            Self::ReadTimeout => "read_timeout",
            Self::NoResponse => "no_response",
            Self::OtherSocket => "other_socket",
            Self::Other => "other",
        }
    }

    /// Socket-level failures are the conditions worth retrying: the request
    /// may never have reached the server, or the server never answered.
    pub const fn is_socket_level(self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// The single error surfaced by request executors: a message, the underlying
/// cause when there is one, and an advisory `retryable` hint. The retry
/// decision itself has already been made by the time a caller sees this.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    kind: TransportErrorKind,
    retryable: bool,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            retryable: kind.is_socket_level(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    pub(crate) fn wrapped(error: TransportError) -> Self {
        Self {
            message: format!("unable to execute HTTP request: {error}"),
            kind: error.kind,
            retryable: error.retryable,
            source: Some(Box::new(error)),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn retryable(&self) -> bool {
        self.retryable
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures of the relay transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// Endpoint unreachable, handshake failed, or the connection dropped.
    #[error("relay connection error: {0}")]
    Connection(String),

    /// Attempted to send while the transport is not open.
    #[error("relay send error: {0}")]
    Send(String),

    /// A message could not be decoded as an envelope.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Reasons a call attempt ends without (or after losing) a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("{0} is not online")]
    TargetUnavailable(String),

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("relay connection lost: {0}")]
    ConnectionLost(String),

    #[error("{0} did not answer")]
    NoAnswer(String),

    #[error("invalid call target: {0}")]
    InvalidTarget(String),

    #[error("a call is already in progress")]
    Busy,

    #[error("local media error: {0}")]
    Media(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PeercallError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

//! Error types for the service adapter.
//!
//! # Design
//! Every failure a call can end in is a variant of `RpcError`, returned as a
//! value. `RemoteFault` is kept apart from `Protocol` because callers show
//! the server's own message ("Invalid credentials") while a protocol failure
//! means the response could not be understood at all. Per-record mapping
//! problems inside a list never surface here; they are logged and dropped.

use thiserror::Error;

/// Coarse classification of an `RpcError`, for callers that only branch on
/// the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Protocol,
    RemoteFault,
    Mapping,
    Encoding,
}

/// Errors returned by `NimbleClient` parse methods and `ServiceAdapter` calls.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The network exchange failed or timed out. Not retried.
    #[error("transport failed: {message}")]
    Transport { message: String, timed_out: bool },

    /// The response could not be decoded into a tree, a scalar or an empty body.
    #[error("malformed response{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Protocol { message: String, status: Option<u16> },

    /// The server signaled a business-level fault.
    #[error("remote fault: {0}")]
    RemoteFault(String),

    /// A payload was located but no record satisfied the required fields.
    #[error("no usable record in response: {0}")]
    Mapping(String),

    /// The outbound envelope could not be serialized.
    #[error("envelope encoding failed: {0}")]
    Encoding(String),
}

impl RpcError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RpcError::Transport { .. } => FailureKind::Transport,
            RpcError::Protocol { .. } => FailureKind::Protocol,
            RpcError::RemoteFault(_) => FailureKind::RemoteFault,
            RpcError::Mapping(_) => FailureKind::Mapping,
            RpcError::Encoding(_) => FailureKind::Encoding,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        RpcError::Protocol {
            message: message.into(),
            status: None,
        }
    }
}

/// Errors raised while reading `ServiceConfig` from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

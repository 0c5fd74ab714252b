//! Error types for the device client.

use plantsync_protocol::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors returned by [`DeviceClient`](crate::DeviceClient) calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection refused, DNS failure, timeout and the like.
    #[error("transport error: {0}")]
    Transport(String),

    /// The device answered with a non-2xx status.
    #[error("device returned HTTP {status}")]
    Http {
        /// Response status code.
        status: u16,
    },

    /// A 2xx response without a usable body on a call that needs one.
    #[error("device returned an empty or unreadable body")]
    EmptyBody,

    /// A body arrived but does not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The request was rejected before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Http { status } => ErrorKind::Http(*status),
            ClientError::EmptyBody => ErrorKind::EmptyBody,
            ClientError::Decode(_) => ErrorKind::Decode,
            ClientError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::EmptyPayload | ProtocolError::Unparseable(_) => ClientError::EmptyBody,
            ProtocolError::InvalidCommand(msg) => ClientError::InvalidRequest(msg),
            other => ClientError::Decode(other.to_string()),
        }
    }
}

/// Coarse error classification exposed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Network-level failure.
    Transport,
    /// Non-2xx response with the given status.
    Http(u16),
    /// Missing or unparseable body.
    EmptyBody,
    /// Body of the wrong shape.
    Decode,
    /// Rejected client-side.
    InvalidRequest,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => f.write_str("transport"),
            ErrorKind::Http(status) => write!(f, "http {status}"),
            ErrorKind::EmptyBody => f.write_str("empty body"),
            ErrorKind::Decode => f.write_str("decode"),
            ErrorKind::InvalidRequest => f.write_str("invalid request"),
        }
    }
}

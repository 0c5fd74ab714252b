//! Error types for the protocol layer.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding payloads or validating commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The payload was empty or the JSON literal `null`.
    #[error("empty payload")]
    EmptyPayload,

    /// The payload is not valid JSON.
    #[error("unparseable payload: {0}")]
    Unparseable(String),

    /// The payload is valid JSON but does not match the expected shape.
    #[error("unexpected payload shape: {0}")]
    Shape(String),

    /// A field holds a value that cannot be represented.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Wire name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A command failed its client-side precondition.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl ProtocolError {
    /// Classifies a `serde_json` failure.
    ///
    /// Syntax and truncation errors mean nothing usable arrived; data errors
    /// mean a document arrived in the wrong shape.
    pub fn from_json(err: &serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Syntax | Category::Eof | Category::Io => Self::Unparseable(err.to_string()),
            Category::Data => Self::Shape(err.to_string()),
        }
    }

    /// Returns true if the error means the payload was missing or unreadable.
    pub fn is_empty_body(&self) -> bool {
        matches!(self, Self::EmptyPayload | Self::Unparseable(_))
    }
}

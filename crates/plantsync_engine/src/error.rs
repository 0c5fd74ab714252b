//! Error types for the sync engine.

use plantsync_client::ClientError;
use plantsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors returned to callers of the engine.
///
/// None of these stop the poll loop; they are reported to whoever made the
/// call and, for device failures, recorded in the observable state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The device call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The command failed validation and was not sent.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The engine has been stopped.
    #[error("sync engine stopped")]
    Stopped,

    /// Invalid lifecycle transition.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Current phase.
        from: String,
        /// Attempted target.
        to: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

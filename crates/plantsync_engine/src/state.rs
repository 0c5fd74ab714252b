//! Observable engine state.

use chrono::{DateTime, Utc};
use plantsync_client::{ClientError, ErrorKind};
use plantsync_protocol::{Command, CommandKind, DeviceSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Lifecycle phase of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    /// Created, loop not started.
    Idle,
    /// A fetch is in flight.
    Polling,
    /// Sleeping until the next poll.
    Waiting,
    /// Stopped for good.
    Stopped,
}

impl EnginePhase {
    /// Returns true while the loop is running.
    pub fn is_running(&self) -> bool {
        matches!(self, EnginePhase::Polling | EnginePhase::Waiting)
    }
}

/// A device failure recorded in state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Coarse classification.
    pub kind: ErrorKind,
    /// Human readable description.
    pub message: String,
    /// When the failure was observed.
    pub at: DateTime<Utc>,
}

impl ErrorInfo {
    /// Captures a client error.
    pub fn from_error(err: &ClientError, at: DateTime<Utc>) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            at,
        }
    }
}

/// Resolution of a submitted command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandResult {
    /// The request is in flight.
    Pending,
    /// The device acknowledged the command.
    Succeeded,
    /// The request failed.
    Failed(ErrorInfo),
    /// The caller gave up before the device answered. The device may or may
    /// not have applied the command.
    Cancelled,
}

/// Status of the most recently submitted command of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStatus {
    /// Per-kind submission sequence number, starting at 1.
    pub sequence: u64,
    /// The command.
    pub command: Command,
    /// Its resolution so far.
    pub result: CommandResult,
    /// When `result` last changed.
    pub updated_at: DateTime<Utc>,
}

/// The engine's exposed state.
///
/// Owned by the engine; subscribers only ever see clones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Last successfully fetched device state.
    pub snapshot: Option<DeviceSnapshot>,
    /// True while at least one fetch is in flight.
    pub loading: bool,
    /// Failure of the most recent poll, cleared by the next success.
    pub last_error: Option<ErrorInfo>,
    /// Latest submitted command per kind.
    pub commands: BTreeMap<CommandKind, CommandStatus>,
}

impl SyncState {
    /// Returns the status of the latest command of `kind`.
    pub fn command(&self, kind: CommandKind) -> Option<&CommandStatus> {
        self.commands.get(&kind)
    }

    /// Returns true if the snapshot is older than `max_age`.
    ///
    /// A state without a snapshot is not stale; there is nothing to age.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|s| s.is_stale(now, max_age))
    }
}

//! # PlantSync Engine
//!
//! Keeps a local view of one soil-moisture controller in sync.
//!
//! This crate provides:
//! - A poll loop that refreshes the device snapshot on a fixed interval
//! - A command dispatcher for set-points and pump triggers
//! - An observable [`SyncState`] that presentation code subscribes to
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --start--> Polling <--> Waiting
//!   \                 \          /
//!    `------stop-------`--> Stopped
//! ```
//!
//! ## Key Invariants
//!
//! - A poll result is published only if no later-started poll was published first
//! - A failed poll never clears the last good snapshot
//! - Only the newest command of each kind resolves its status
//! - Nothing is published after `stop()` returns

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod state;

pub use config::{SyncConfig, DEFAULT_POLL_INTERVAL};
pub use engine::{CommandOutcome, CommandSender, PollOutcome, SyncEngine};
pub use error::{EngineError, EngineResult};
pub use state::{CommandResult, CommandStatus, EnginePhase, ErrorInfo, SyncState};

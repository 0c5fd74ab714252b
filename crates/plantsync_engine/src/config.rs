//! Configuration for the sync engine.

use crate::error::{EngineError, EngineResult};
use plantsync_client::validate_base_url;
use std::time::Duration;

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for a sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Device base URL (e.g., "http://192.168.4.1").
    pub base_url: String,
    /// Wait between the end of one poll and the start of the next.
    pub poll_interval: Duration,
    /// Age after which a snapshot counts as stale.
    pub stale_after: Duration,
    /// Patch the snapshot as soon as a set-point command succeeds.
    pub optimistic_updates: bool,
}

impl SyncConfig {
    /// Creates a configuration with default timings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            stale_after: DEFAULT_POLL_INTERVAL * 3,
            optimistic_updates: true,
        }
    }

    /// Sets the poll interval.
    ///
    /// The staleness threshold follows at three intervals unless set
    /// explicitly afterwards.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self.stale_after = interval * 3;
        self
    }

    /// Sets the staleness threshold.
    #[must_use]
    pub fn with_stale_after(mut self, max_age: Duration) -> Self {
        self.stale_after = max_age;
        self
    }

    /// Enables or disables optimistic snapshot patches.
    #[must_use]
    pub fn with_optimistic_updates(mut self, enabled: bool) -> Self {
        self.optimistic_updates = enabled;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        validate_base_url(&self.base_url).map_err(|e| EngineError::Config(e.to_string()))?;
        if self.poll_interval.is_zero() {
            return Err(EngineError::Config("poll interval must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("http://192.168.4.1")
    }
}

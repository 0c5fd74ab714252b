//! CLI command implementations.

pub mod control;
pub mod status;
pub mod watch;

use plantsync_client::ReqwestClient;
use plantsync_engine::{SyncConfig, SyncEngine};

/// Builds an engine over the reqwest transport.
pub fn connect(config: SyncConfig) -> Result<SyncEngine<ReqwestClient>, Box<dyn std::error::Error>> {
    let http = ReqwestClient::new()?;
    Ok(SyncEngine::new(config, http)?)
}

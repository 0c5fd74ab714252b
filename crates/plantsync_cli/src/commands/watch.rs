//! Watch command implementation.

use crate::render::{render_json, render_state};
use chrono::Utc;
use plantsync_engine::SyncConfig;
use tracing::{info, warn};

/// Runs the poll loop and prints every state change until Ctrl-C.
pub async fn run(config: SyncConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stale_after = config.stale_after;
    let engine = super::connect(config)?;
    let mut updates = engine.subscribe();
    engine.start()?;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                // Print settled states only.
                if state.loading {
                    continue;
                }
                if json {
                    match render_json(&state) {
                        Ok(text) => println!("{text}"),
                        Err(e) => warn!(error = %e, "failed to encode state"),
                    }
                } else {
                    println!("{}", render_state(&state, Utc::now(), stale_after));
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
                info!("interrupted");
                break;
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}

//! Status command implementation.

use crate::render::{render_json, render_state};
use chrono::Utc;
use plantsync_client::HttpClient;
use plantsync_engine::{SyncConfig, SyncEngine};
use std::io::Write;

/// Runs the status command: one poll, then print.
pub async fn run(config: SyncConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = super::connect(config)?;
    report(&engine, json, &mut std::io::stdout()).await
}

/// Polls once and writes the resulting state to `out`.
///
/// The state is written even when the poll fails, so the recorded error is
/// visible before it is returned.
pub async fn report<C: HttpClient, W: Write>(
    engine: &SyncEngine<C>,
    json: bool,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    let polled = engine.poll_once().await;

    let state = engine.state();
    if json {
        writeln!(out, "{}", render_json(&state)?)?;
    } else {
        write!(
            out,
            "{}",
            render_state(&state, Utc::now(), engine.config().stale_after)
        )?;
    }

    polled?;
    Ok(())
}

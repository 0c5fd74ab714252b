//! Text rendering of the sync state.

use chrono::{DateTime, Utc};
use plantsync_engine::{CommandResult, SyncState};
use std::fmt::Write;
use std::time::Duration;

/// Renders `state` as a human readable block.
pub fn render_state(state: &SyncState, now: DateTime<Utc>, stale_after: Duration) -> String {
    let mut out = String::new();

    match &state.snapshot {
        Some(s) => {
            let _ = writeln!(out, "temperature    {:.1} °C", s.temperature);
            let _ = writeln!(out, "air humidity   {:.1} %", s.air_humidity);
            let _ = writeln!(
                out,
                "soil moisture  {} (target {})",
                s.soil_moisture, s.desired_moisture
            );
            let _ = writeln!(out, "light level    {}", s.light_level);
            let _ = writeln!(
                out,
                "auto-watering  {}",
                if s.auto_watering_enabled { "on" } else { "off" }
            );
            if let Some(seconds) = s.pump_duration_seconds {
                let _ = writeln!(out, "pump duration  {seconds} s");
            }
            if let Some(date) = &s.full_date {
                let _ = writeln!(out, "device time    {date}");
            }
            let age = s.age(now).as_secs();
            let stale = if s.is_stale(now, stale_after) {
                " [stale]"
            } else {
                ""
            };
            let _ = writeln!(out, "observed       {age}s ago{stale}");
        }
        None if state.loading => out.push_str("waiting for first reading...\n"),
        None => out.push_str("no reading yet\n"),
    }

    if let Some(err) = &state.last_error {
        let _ = writeln!(
            out,
            "last poll      failed ({}): {}",
            err.kind, err.message
        );
    }

    for status in state.commands.values() {
        let result = match &status.result {
            CommandResult::Pending => "pending".to_string(),
            CommandResult::Succeeded => "ok".to_string(),
            CommandResult::Failed(err) => format!("failed: {}", err.message),
            CommandResult::Cancelled => "cancelled".to_string(),
        };
        let _ = writeln!(out, "{:<14} {}", status.command.describe(), result);
    }

    out
}

/// Renders `state` as pretty-printed JSON.
pub fn render_json(state: &SyncState) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(state)
}

//! One-shot device commands.

use plantsync_engine::{CommandOutcome, SyncConfig};
use plantsync_protocol::Command;
use tracing::info;

/// Sends one command and reports the device's answer.
pub async fn run(config: SyncConfig, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let engine = super::connect(config)?;
    let sender = engine.command_sender();

    info!(%command, base_url = %engine.config().base_url, "sending command");
    match sender.submit(command).await? {
        CommandOutcome::Applied => println!("{}: ok", command.describe()),
        CommandOutcome::Superseded { .. } => println!("{}: superseded", command.describe()),
    }
    Ok(())
}

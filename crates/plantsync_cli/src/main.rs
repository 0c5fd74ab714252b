//! PlantSync CLI
//!
//! Terminal client for the soil-moisture controller.
//!
//! # Commands
//!
//! - `watch` - Poll the device and print every change
//! - `status` - Poll once and print the device state
//! - `set-moisture` - Change the moisture set-point
//! - `auto-watering` - Turn automatic watering on or off
//! - `pump-duration` - Change the pump run time
//! - `water-now` - Run the pump immediately
//! - `debug-pump` - Run the pump through the debug endpoint

mod commands;
mod render;

use clap::{Parser, Subcommand, ValueEnum};
use plantsync_client::DeviceEndpoint;
use plantsync_engine::{SyncConfig, DEFAULT_POLL_INTERVAL};
use plantsync_protocol::Command;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Terminal client for the PlantSync soil-moisture controller.
#[derive(Parser)]
#[command(name = "plantsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Device base URL
    #[arg(
        global = true,
        short,
        long,
        env = "PLANTSYNC_URL",
        default_value = "http://192.168.4.1"
    )]
    url: String,

    /// Device host name or IP address; overrides --url
    #[arg(global = true, long, env = "PLANTSYNC_HOST")]
    host: Option<String>,

    /// Device port, used with --host
    #[arg(global = true, long, default_value_t = 80)]
    port: u16,

    /// Connect over HTTPS, used with --host
    #[arg(global = true, long)]
    tls: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Base URL of the device, built from --host when it is given.
    fn base_url(&self) -> String {
        match &self.host {
            Some(host) => DeviceEndpoint::new(host.as_str(), self.port)
                .with_tls(self.tls)
                .base_url(),
            None => self.url.clone(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the device and print every change until Ctrl-C
    Watch {
        /// Seconds between polls
        #[arg(short, long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
        interval: u64,

        /// Print states as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll once and print the device state
    Status {
        /// Print the state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change the moisture set-point (0-4095)
    SetMoisture {
        /// Target moisture level, raw sensor units
        level: u16,
    },

    /// Turn automatic watering on or off
    AutoWatering {
        /// New setting
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Change the pump run time
    PumpDuration {
        /// Run time in seconds
        seconds: u32,
    },

    /// Run the pump immediately
    WaterNow,

    /// Run the pump through the debug endpoint
    DebugPump,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = SyncConfig::new(cli.base_url());

    match cli.command {
        Commands::Watch { interval, json } => {
            let config = config.with_poll_interval(Duration::from_secs(interval));
            commands::watch::run(config, json).await?;
        }
        Commands::Status { json } => commands::status::run(config, json).await?,
        Commands::SetMoisture { level } => {
            commands::control::run(config, Command::SetDesiredMoisture(level)).await?;
        }
        Commands::AutoWatering { state } => {
            let enabled = matches!(state, Toggle::On);
            commands::control::run(config, Command::SetAutoWatering(enabled)).await?;
        }
        Commands::PumpDuration { seconds } => {
            commands::control::run(config, Command::SetPumpDuration(seconds)).await?;
        }
        Commands::WaterNow => commands::control::run(config, Command::TriggerWaterNow).await?,
        Commands::DebugPump => commands::control::run(config, Command::TriggerDebugPump).await?,
    }

    Ok(())
}

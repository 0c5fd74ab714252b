//! User- and system-initiated commands.

use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::{encode, AutoWateringRequest, MoistureRequest, PumpDurationRequest};
use crate::snapshot::MAX_MOISTURE_LEVEL;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A mutation request sent to the device.
///
/// Commands are fire-once: each submission maps to exactly one HTTP call and
/// is never retried or queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Change the moisture set-point (`0..=4095`).
    SetDesiredMoisture(u16),
    /// Turn automatic watering on or off.
    SetAutoWatering(bool),
    /// Change the pump run time in seconds (must be positive).
    SetPumpDuration(u32),
    /// Run the pump immediately.
    TriggerWaterNow,
    /// Run the pump through the firmware's debug endpoint.
    TriggerDebugPump,
}

impl Command {
    /// Returns the kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SetDesiredMoisture(_) => CommandKind::SetDesiredMoisture,
            Command::SetAutoWatering(_) => CommandKind::SetAutoWatering,
            Command::SetPumpDuration(_) => CommandKind::SetPumpDuration,
            Command::TriggerWaterNow => CommandKind::WaterNow,
            Command::TriggerDebugPump => CommandKind::DebugPump,
        }
    }

    /// Checks the client-side preconditions.
    pub fn validate(&self) -> ProtocolResult<()> {
        match *self {
            Command::SetDesiredMoisture(level) if level > MAX_MOISTURE_LEVEL => {
                Err(ProtocolError::InvalidCommand(format!(
                    "moisture level {level} exceeds {MAX_MOISTURE_LEVEL}"
                )))
            }
            Command::SetPumpDuration(0) => Err(ProtocolError::InvalidCommand(
                "pump duration must be at least one second".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Encodes the JSON request body, if the endpoint takes one.
    pub fn body(&self) -> ProtocolResult<Option<Vec<u8>>> {
        self.validate()?;
        match *self {
            Command::SetDesiredMoisture(level) => encode(&MoistureRequest { level }).map(Some),
            Command::SetAutoWatering(enabled) => {
                encode(&AutoWateringRequest { enabled }).map(Some)
            }
            Command::SetPumpDuration(duration) => {
                encode(&PumpDurationRequest { duration }).map(Some)
            }
            Command::TriggerWaterNow | Command::TriggerDebugPump => Ok(None),
        }
    }

    /// Short human readable summary, suitable for a status line.
    pub fn describe(&self) -> String {
        match self {
            Command::SetDesiredMoisture(level) => format!("set desired moisture to {level}"),
            Command::SetAutoWatering(true) => "enable auto-watering".into(),
            Command::SetAutoWatering(false) => "disable auto-watering".into(),
            Command::SetPumpDuration(seconds) => format!("set pump duration to {seconds}s"),
            Command::TriggerWaterNow => "water the plant now".into(),
            Command::TriggerDebugPump => "run the debug pump".into(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Discriminant of a [`Command`], used to order resolutions per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommandKind {
    /// [`Command::SetDesiredMoisture`].
    SetDesiredMoisture,
    /// [`Command::SetAutoWatering`].
    SetAutoWatering,
    /// [`Command::SetPumpDuration`].
    SetPumpDuration,
    /// [`Command::TriggerWaterNow`].
    WaterNow,
    /// [`Command::TriggerDebugPump`].
    DebugPump,
}

impl CommandKind {
    /// Number of command kinds.
    pub const COUNT: usize = 5;

    /// All kinds, in declaration order.
    pub const ALL: [CommandKind; Self::COUNT] = [
        CommandKind::SetDesiredMoisture,
        CommandKind::SetAutoWatering,
        CommandKind::SetPumpDuration,
        CommandKind::WaterNow,
        CommandKind::DebugPump,
    ];

    /// Dense index in `0..COUNT`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::SetDesiredMoisture => "set_desired_moisture",
            CommandKind::SetAutoWatering => "set_auto_watering",
            CommandKind::SetPumpDuration => "set_pump_duration",
            CommandKind::WaterNow => "water_now",
            CommandKind::DebugPump => "debug_pump",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

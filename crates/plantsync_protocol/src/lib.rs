//! # PlantSync Protocol
//!
//! Wire types and the command model for the soil-moisture controller API.
//!
//! This crate provides:
//! - The `/data` payload ([`DeviceReading`]) and its validated form ([`DeviceSnapshot`])
//! - Request bodies for the control endpoints
//! - The [`Command`] model submitted by callers
//!
//! ## Key Invariants
//!
//! - JSON field names are part of the device wire contract and never change
//! - `desired_moisture` of a snapshot is always within `0..=4095`
//! - Integer sensor fields of a snapshot are never negative
//! - A command that fails validation never reaches the network

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod error;
mod messages;
mod snapshot;

pub use command::{Command, CommandKind};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{AutoWateringRequest, MoistureRequest, PumpDurationRequest};
pub use snapshot::{DeviceReading, DeviceSnapshot, MAX_MOISTURE_LEVEL};

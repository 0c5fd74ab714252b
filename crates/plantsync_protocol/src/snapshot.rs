//! Device state: the `/data` payload and its validated snapshot.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Upper bound of the moisture sensor ADC.
pub const MAX_MOISTURE_LEVEL: u16 = 4095;

/// The `/data` payload exactly as the device sends it.
///
/// Integer fields are signed so out-of-range readings can be clamped when
/// the payload is turned into a [`DeviceSnapshot`] instead of failing the
/// whole poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceReading {
    /// Ambient temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative air humidity in percent.
    pub air_humidity: f32,
    /// Raw soil moisture reading.
    pub soil_moisture: i64,
    /// Raw light sensor reading.
    pub light_level: i64,
    /// Moisture set-point reported by the device.
    pub desired_moisture: i64,
    /// Auto-watering flag. Some firmware omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_watering: Option<bool>,
    /// Device-reported timestamp, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_date: Option<String>,
    /// Pump run time in seconds. Only newer firmware reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pump_duration: Option<i64>,
}

impl DeviceReading {
    /// Decodes a `/data` response body.
    pub fn from_json(body: &[u8]) -> ProtocolResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ProtocolError::EmptyPayload);
        }

        serde_json::from_slice::<Option<Self>>(body)
            .map_err(|e| ProtocolError::from_json(&e))?
            .ok_or(ProtocolError::EmptyPayload)
    }

    /// Validates the reading and stamps it with the client receipt time.
    ///
    /// `previous` supplies the auto-watering flag when the device omits it.
    pub fn into_snapshot(
        self,
        observed_at: DateTime<Utc>,
        previous: Option<&DeviceSnapshot>,
    ) -> ProtocolResult<DeviceSnapshot> {
        let temperature = finite("temperature", self.temperature)?;
        let air_humidity = finite("airHumidity", self.air_humidity)?;

        let auto_watering_enabled = self
            .auto_watering
            .or_else(|| previous.map(|p| p.auto_watering_enabled))
            .unwrap_or(false);

        Ok(DeviceSnapshot {
            temperature,
            air_humidity,
            soil_moisture: clamp_u32("soilMoisture", self.soil_moisture),
            light_level: clamp_u32("lightLevel", self.light_level),
            desired_moisture: clamp_field(
                "desiredMoisture",
                self.desired_moisture,
                i64::from(MAX_MOISTURE_LEVEL),
            ) as u16,
            auto_watering_enabled,
            pump_duration_seconds: self.pump_duration.map(|d| clamp_u32("pumpDuration", d)),
            full_date: self.full_date,
            observed_at,
        })
    }
}

/// Last known device state.
///
/// Snapshots are immutable values; the sync engine replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Ambient temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative air humidity in percent.
    pub air_humidity: f32,
    /// Raw soil moisture reading.
    pub soil_moisture: u32,
    /// Raw light sensor reading.
    pub light_level: u32,
    /// Moisture set-point, always within `0..=MAX_MOISTURE_LEVEL`.
    pub desired_moisture: u16,
    /// Whether the controller waters on its own.
    pub auto_watering_enabled: bool,
    /// Pump run time in seconds, if the firmware reports it.
    pub pump_duration_seconds: Option<u32>,
    /// Device-reported timestamp.
    pub full_date: Option<String>,
    /// When this client received the reading.
    pub observed_at: DateTime<Utc>,
}

impl DeviceSnapshot {
    /// Time elapsed since the reading was received.
    ///
    /// Readings stamped in the future count as fresh.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.observed_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Returns true if the reading is older than `max_age`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }
}

fn finite(field: &'static str, value: f32) -> ProtocolResult<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProtocolError::InvalidField {
            field,
            reason: format!("{value} is not a finite number"),
        })
    }
}

fn clamp_u32(field: &'static str, value: i64) -> u32 {
    clamp_field(field, value, i64::from(u32::MAX)) as u32
}

fn clamp_field(field: &'static str, value: i64, max: i64) -> i64 {
    let clamped = value.clamp(0, max);
    if clamped != value {
        warn!(field, value, clamped, "device reported out-of-range value");
    }
    clamped
}

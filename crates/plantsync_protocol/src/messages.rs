//! Request bodies for the control endpoints.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// Body of `POST /setMoisture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoistureRequest {
    /// Target moisture level, raw ADC units.
    pub level: u16,
}

/// Body of `POST /setAutoWatering`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoWateringRequest {
    /// Whether the controller waters on its own.
    pub enabled: bool,
}

/// Body of `POST /setPumpDuration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpDurationRequest {
    /// Pump run time in seconds.
    pub duration: u32,
}

/// Encodes a request body as JSON bytes.
pub(crate) fn encode<T: Serialize>(body: &T) -> ProtocolResult<Vec<u8>> {
    serde_json::to_vec(body).map_err(|e| ProtocolError::Shape(e.to_string()))
}

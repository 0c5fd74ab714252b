//! Typed device API.

use crate::error::{ClientError, ClientResult};
use crate::http::{HttpClient, HttpResponse};
use chrono::Utc;
use plantsync_protocol::{Command, DeviceReading, DeviceSnapshot};
use tracing::{debug, warn};

/// Endpoint paths of the device API.
pub mod paths {
    /// `GET` current readings.
    pub const DATA: &str = "/data";
    /// `POST {"level": int}`.
    pub const SET_MOISTURE: &str = "/setMoisture";
    /// `POST {"enabled": bool}`.
    pub const SET_AUTO_WATERING: &str = "/setAutoWatering";
    /// `POST`, no body.
    pub const WATER_PLANT: &str = "/waterPlant";
    /// `GET`, no body.
    pub const DEBUG_PUMP: &str = "/debugPump";
    /// `POST {"duration": int}`.
    pub const SET_PUMP_DURATION: &str = "/setPumpDuration";
}

/// Client for one device.
pub struct DeviceClient<C: HttpClient> {
    /// Base URL without a trailing slash.
    base_url: String,
    /// HTTP client implementation.
    client: C,
}

impl<C: HttpClient> DeviceClient<C> {
    /// Creates a client for the device at `base_url`.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying HTTP client.
    pub fn http(&self) -> &C {
        &self.client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetches the raw `/data` payload.
    pub async fn fetch_reading(&self) -> ClientResult<DeviceReading> {
        let response = self.get(paths::DATA).await?;
        DeviceReading::from_json(&response.body).map_err(|e| {
            warn!(error = %e, "failed to decode device reading");
            ClientError::from(e)
        })
    }

    /// Fetches and validates the current device state.
    pub async fn fetch_snapshot(&self) -> ClientResult<DeviceSnapshot> {
        let reading = self.fetch_reading().await?;
        Ok(reading.into_snapshot(Utc::now(), None)?)
    }

    /// Sets the moisture set-point.
    pub async fn set_desired_moisture(&self, level: u16) -> ClientResult<()> {
        self.execute(&Command::SetDesiredMoisture(level)).await
    }

    /// Enables or disables automatic watering.
    pub async fn set_auto_watering(&self, enabled: bool) -> ClientResult<()> {
        self.execute(&Command::SetAutoWatering(enabled)).await
    }

    /// Runs the pump immediately.
    pub async fn trigger_water_now(&self) -> ClientResult<()> {
        self.execute(&Command::TriggerWaterNow).await
    }

    /// Runs the pump through the debug endpoint.
    pub async fn trigger_debug_pump(&self) -> ClientResult<()> {
        self.execute(&Command::TriggerDebugPump).await
    }

    /// Sets the pump run time in seconds.
    pub async fn set_pump_duration(&self, seconds: u32) -> ClientResult<()> {
        self.execute(&Command::SetPumpDuration(seconds)).await
    }

    /// Sends a command to its endpoint.
    ///
    /// The command is validated first; an invalid command makes no request.
    pub async fn execute(&self, command: &Command) -> ClientResult<()> {
        let body = command.body()?;
        match command {
            Command::SetDesiredMoisture(_) => self.post(paths::SET_MOISTURE, body).await?,
            Command::SetAutoWatering(_) => self.post(paths::SET_AUTO_WATERING, body).await?,
            Command::SetPumpDuration(_) => self.post(paths::SET_PUMP_DURATION, body).await?,
            Command::TriggerWaterNow => self.post(paths::WATER_PLANT, body).await?,
            Command::TriggerDebugPump => self.get(paths::DEBUG_PUMP).await?,
        };
        Ok(())
    }

    async fn get(&self, path: &str) -> ClientResult<HttpResponse> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.client.get(&url).await;
        check(path, response)
    }

    async fn post(&self, path: &str, body: Option<Vec<u8>>) -> ClientResult<HttpResponse> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self.client.post(&url, body).await;
        check(path, response)
    }
}

fn check(path: &str, response: Result<HttpResponse, String>) -> ClientResult<HttpResponse> {
    match response {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => {
            warn!(path, status = response.status, "device rejected request");
            Err(ClientError::Http {
                status: response.status,
            })
        }
        Err(e) => {
            warn!(path, error = %e, "request failed");
            Err(ClientError::Transport(e))
        }
    }
}

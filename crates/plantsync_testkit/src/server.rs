//! A fake device served over real HTTP.
//!
//! Used to exercise the reqwest transport end to end. The server binds to
//! localhost on a random port and speaks the same routes as the firmware.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use plantsync_client::paths;
use plantsync_protocol::{AutoWateringRequest, DeviceReading, MoistureRequest, PumpDurationRequest};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Everything the fake device remembers.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeDeviceState {
    /// Served on `/data`.
    pub reading: DeviceReading,
    /// When set, `/data` answers with this status instead.
    pub fail_data_with: Option<u16>,
    /// Number of `/waterPlant` calls.
    pub pump_runs: u32,
    /// Number of `/debugPump` calls.
    pub debug_pump_runs: u32,
}

type Shared = Arc<Mutex<FakeDeviceState>>;

/// A running fake device.
pub struct FakeDeviceServer {
    addr: SocketAddr,
    state: Shared,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl FakeDeviceServer {
    /// Starts serving `reading` on a random localhost port.
    pub async fn start(reading: DeviceReading) -> std::io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(Mutex::new(FakeDeviceState {
            reading,
            fail_data_with: None,
            pump_runs: 0,
            debug_pump_runs: 0,
        }));
        let app = router(Arc::clone(&state));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!(error = %e, "fake device server failed");
            }
        });
        debug!(%addr, "fake device listening");

        Ok(Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Base URL of the server, e.g. `http://127.0.0.1:41234`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Returns a copy of the device state.
    pub fn state(&self) -> FakeDeviceState {
        self.state.lock().clone()
    }

    /// Replaces the reading served on `/data`.
    pub fn set_reading(&self, reading: DeviceReading) {
        self.state.lock().reading = reading;
    }

    /// Makes `/data` fail with `status`, or succeed again with `None`.
    pub fn fail_data_with(&self, status: Option<u16>) {
        self.state.lock().fail_data_with = status;
    }

    /// Shuts the server down and waits for it to exit.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for FakeDeviceServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route(paths::DATA, get(data))
        .route(paths::SET_MOISTURE, post(set_moisture))
        .route(paths::SET_AUTO_WATERING, post(set_auto_watering))
        .route(paths::WATER_PLANT, post(water_plant))
        .route(paths::DEBUG_PUMP, get(debug_pump))
        .route(paths::SET_PUMP_DURATION, post(set_pump_duration))
        .with_state(state)
}

async fn data(State(state): State<Shared>) -> Response {
    let (reading, fail_with) = {
        let state = state.lock();
        (state.reading.clone(), state.fail_data_with)
    };
    match fail_with {
        Some(status) => StatusCode::from_u16(status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        None => Json(reading).into_response(),
    }
}

async fn set_moisture(State(state): State<Shared>, Json(body): Json<MoistureRequest>) -> StatusCode {
    state.lock().reading.desired_moisture = i64::from(body.level);
    StatusCode::OK
}

async fn set_auto_watering(
    State(state): State<Shared>,
    Json(body): Json<AutoWateringRequest>,
) -> StatusCode {
    state.lock().reading.auto_watering = Some(body.enabled);
    StatusCode::OK
}

async fn water_plant(State(state): State<Shared>) -> StatusCode {
    state.lock().pump_runs += 1;
    StatusCode::OK
}

async fn debug_pump(State(state): State<Shared>) -> StatusCode {
    state.lock().debug_pump_runs += 1;
    StatusCode::OK
}

async fn set_pump_duration(
    State(state): State<Shared>,
    Json(body): Json<PumpDurationRequest>,
) -> StatusCode {
    state.lock().reading.pump_duration = Some(i64::from(body.duration));
    StatusCode::OK
}

//! A scripted in-process device.
//!
//! [`MockDevice`] implements [`HttpClient`] directly, so engine tests run
//! without sockets and under a paused tokio clock. Responses are scripted per
//! route: queued responses are consumed first, then the route's fallback,
//! then a 404.

use async_trait::async_trait;
use parking_lot::Mutex;
use plantsync_client::{paths, HttpClient, HttpResponse};
use plantsync_protocol::DeviceReading;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tokio::sync::oneshot;

/// HTTP method of a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// A response with a status and body.
    Reply {
        /// Status code.
        status: u16,
        /// Body bytes.
        body: Vec<u8>,
    },
    /// The request never produced a response.
    TransportError(String),
}

impl MockResponse {
    /// 200 with an empty body.
    pub fn ok() -> Self {
        Self::status(200)
    }

    /// The given status with an empty body.
    pub fn status(status: u16) -> Self {
        Self::Reply {
            status,
            body: Vec::new(),
        }
    }

    /// The given status with a raw body.
    pub fn body(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::Reply {
            status,
            body: body.into(),
        }
    }

    /// 200 with `value` encoded as JSON.
    pub fn json<T: Serialize>(value: &T) -> Self {
        Self::body(200, serde_json::to_vec(value).expect("Failed to encode mock body"))
    }

    /// A transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportError(message.into())
    }

    fn into_result(self) -> Result<HttpResponse, String> {
        match self {
            MockResponse::Reply { status, body } => Ok(HttpResponse::new(status, body)),
            MockResponse::TransportError(message) => Err(message),
        }
    }
}

/// A request the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Method.
    pub method: Method,
    /// Path, without scheme and host.
    pub path: String,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
}

impl RecordedCall {
    /// Parses the body as JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

/// Test side of a gated response.
///
/// The scripted response is held back until [`Gate::release`] is called or
/// the gate is dropped.
#[derive(Debug)]
pub struct Gate {
    started: Option<oneshot::Receiver<()>>,
    release: Option<oneshot::Sender<()>>,
}

impl Gate {
    /// Waits until the gated request has arrived at the mock.
    pub async fn wait_started(&mut self) {
        if let Some(started) = self.started.take() {
            let _ = started.await;
        }
    }

    /// Lets the gated response through.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
        }
    }
}

struct Scripted {
    response: MockResponse,
    gate: Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>,
}

type Route = (Method, String);

/// A scripted device.
#[derive(Default)]
pub struct MockDevice {
    queued: Mutex<HashMap<Route, VecDeque<Scripted>>>,
    fallbacks: Mutex<HashMap<Route, MockResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockDevice {
    /// Creates a device with no routes; every request gets a 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a device that serves `reading` on `/data` and acknowledges
    /// every command.
    pub fn healthy(reading: DeviceReading) -> Self {
        let device = Self::new();
        device.set_reading(&reading);
        for path in [
            paths::SET_MOISTURE,
            paths::SET_AUTO_WATERING,
            paths::WATER_PLANT,
            paths::SET_PUMP_DURATION,
        ] {
            device.set_fallback(Method::Post, path, MockResponse::ok());
        }
        device.set_fallback(Method::Get, paths::DEBUG_PUMP, MockResponse::ok());
        device
    }

    /// Serves `reading` on `/data` once the queue is drained.
    pub fn set_reading(&self, reading: &DeviceReading) {
        self.set_fallback(Method::Get, paths::DATA, MockResponse::json(reading));
    }

    /// Sets the response a route returns once its queue is drained.
    pub fn set_fallback(&self, method: Method, path: &str, response: MockResponse) {
        self.fallbacks
            .lock()
            .insert((method, path.to_string()), response);
    }

    /// Queues a one-off response for a route.
    pub fn enqueue(&self, method: Method, path: &str, response: MockResponse) {
        self.push(
            method,
            path,
            Scripted {
                response,
                gate: None,
            },
        );
    }

    /// Queues a one-off response that is held until the returned gate is
    /// released.
    pub fn enqueue_gated(&self, method: Method, path: &str, response: MockResponse) -> Gate {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.push(
            method,
            path,
            Scripted {
                response,
                gate: Some((started_tx, release_rx)),
            },
        );
        Gate {
            started: Some(started_rx),
            release: Some(release_tx),
        }
    }

    /// Returns every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Counts calls to one route.
    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.queued
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    fn next_scripted(&self, route: &Route) -> Option<Scripted> {
        self.queued
            .lock()
            .get_mut(route)
            .and_then(VecDeque::pop_front)
    }

    fn fallback(&self, route: &Route) -> MockResponse {
        self.fallbacks
            .lock()
            .get(route)
            .cloned()
            .unwrap_or_else(|| MockResponse::status(404))
    }

    async fn respond(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, String> {
        let route = (method, path_of(url).to_string());
        self.calls.lock().push(RecordedCall {
            method,
            path: route.1.clone(),
            body,
        });

        let response = match self.next_scripted(&route) {
            Some(Scripted {
                response,
                gate: Some((started, release)),
            }) => {
                let _ = started.send(());
                let _ = release.await;
                response
            }
            Some(Scripted { response, .. }) => response,
            None => self.fallback(&route),
        };
        response.into_result()
    }
}

#[async_trait]
impl HttpClient for MockDevice {
    async fn get(&self, url: &str) -> Result<HttpResponse, String> {
        self.respond(Method::Get, url, None).await
    }

    async fn post(&self, url: &str, body: Option<Vec<u8>>) -> Result<HttpResponse, String> {
        self.respond(Method::Post, url, body).await
    }
}

fn path_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.find('/').map_or("/", |i| &rest[i..])
}

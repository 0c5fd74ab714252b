//! Device address configuration.

use crate::error::{ClientError, ClientResult};
use reqwest::Url;

/// Address of a device's local HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Whether to connect over HTTPS.
    pub tls: bool,
}

impl DeviceEndpoint {
    /// Creates a plaintext endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: false,
        }
    }

    /// Sets whether to use TLS.
    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Returns the base URL, e.g. `http://192.168.4.1:80`.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

/// Checks that `base_url` is an absolute `http` or `https` URL.
pub fn validate_base_url(base_url: &str) -> ClientResult<()> {
    let url = Url::parse(base_url)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid base URL {base_url:?}: {e}")))?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        "http" | "https" => Err(ClientError::InvalidRequest(format!(
            "base URL {base_url:?} has no host"
        ))),
        other => Err(ClientError::InvalidRequest(format!(
            "unsupported scheme {other:?} in base URL"
        ))),
    }
}

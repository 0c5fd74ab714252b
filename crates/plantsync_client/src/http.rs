//! HTTP transport.
//!
//! The actual HTTP client is abstracted via a trait so the device client can
//! run against reqwest in production and scripted fakes in tests.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body, possibly empty.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Errors are transport failures only; any response that arrived, whatever
/// its status, is returned as `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    async fn get(&self, url: &str) -> Result<HttpResponse, String>;

    /// Sends a POST request with an optional JSON body.
    async fn post(&self, url: &str, body: Option<Vec<u8>>) -> Result<HttpResponse, String>;
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    async fn get(&self, url: &str) -> Result<HttpResponse, String> {
        (**self).get(url).await
    }

    async fn post(&self, url: &str, body: Option<Vec<u8>>) -> Result<HttpResponse, String> {
        (**self).post(url, body).await
    }
}

/// [`HttpClient`] backed by `reqwest`.
///
/// TLS is used whenever the URL scheme is `https`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client that connects directly, ignoring proxy settings.
    ///
    /// Controllers live on the local network and are never reachable
    /// through a proxy.
    pub fn new() -> Result<Self, String> {
        reqwest::Client::builder()
            .no_proxy()
            .build()
            .map(Self::with_client)
            .map_err(|e| e.to_string())
    }

    /// Wraps an existing reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, String> {
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        Self::read(response).await
    }

    async fn post(&self, url: &str, body: Option<Vec<u8>>) -> Result<HttpResponse, String> {
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        Self::read(response).await
    }
}

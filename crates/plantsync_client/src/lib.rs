//! # PlantSync Client
//!
//! Typed bindings for the soil-moisture controller's HTTP API.
//!
//! This crate provides:
//! - [`DeviceClient`], one method per remote endpoint
//! - The [`HttpClient`] seam and a reqwest-backed [`ReqwestClient`]
//! - [`DeviceEndpoint`] for building base URLs, with optional TLS
//!
//! The client has no business logic: it performs no retries, keeps no
//! cache and leaves timeouts to the transport.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod device;
mod endpoint;
mod error;
mod http;

pub use device::{paths, DeviceClient};
pub use endpoint::{validate_base_url, DeviceEndpoint};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use http::{HttpClient, HttpResponse, ReqwestClient};

//! # PlantSync Testkit
//!
//! Test utilities for PlantSync.
//!
//! This crate provides:
//! - [`MockDevice`], a scripted in-process [`HttpClient`](plantsync_client::HttpClient)
//!   with gated responses for ordering tests
//! - [`FakeDeviceServer`], the device routes served over real HTTP
//! - Canned payloads and proptest strategies
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plantsync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn polls_the_device() {
//!     let device = Arc::new(MockDevice::healthy(sample_reading()));
//!     // ... build an engine over `device`
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mock;
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::mock::*;
    pub use crate::server::*;
}

pub use fixtures::*;
pub use generators::*;
pub use mock::*;
pub use server::*;

//! Paleobiology Database (PBDB) source client
//!
//! HTTP client for the PBDB data service, version 1.2.

pub mod client;
pub mod endpoints;
pub mod throttle;
pub mod types;

pub use client::PbdbClient;
pub use throttle::RequestThrottle;

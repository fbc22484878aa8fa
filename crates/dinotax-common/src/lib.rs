//! Dinotax Common Library
//!
//! Shared error handling, logging and checksum utilities for the dinotax workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`DinotaxError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Checksums**: SHA-256 helpers used to fingerprint ingestion snapshots
//!
//! # Example
//!
//! ```no_run
//! use dinotax_common::checksum::compute_file_checksum;
//! use dinotax_common::Result;
//!
//! fn fingerprint(path: &str) -> Result<()> {
//!     let checksum = compute_file_checksum(path)?;
//!     tracing::info!(%checksum, "Snapshot fingerprint");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{DinotaxError, Result};

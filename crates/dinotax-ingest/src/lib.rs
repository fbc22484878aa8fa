//! Dinotax Ingest Library
//!
//! Builds a clean dinosaur taxonomy from the Paleobiology Database (PBDB).
//!
//! # Pipeline
//!
//! - **Source**: [`pbdb::PbdbClient`] behind the [`source::TaxonSource`] trait
//! - **Filter**: drops trace fossils, egg fossils and modern birds ([`filter`])
//! - **Dedup**: one record per scientific name ([`dedup`])
//! - **Lineage**: walks parent links up to the root ([`lineage`])
//! - **Tree**: merges lineages into one rooted tree ([`tree`])
//!
//! # Example
//!
//! ```no_run
//! use dinotax_ingest::config::IngestConfig;
//! use dinotax_ingest::pbdb::PbdbClient;
//! use dinotax_ingest::pipeline::IngestionPipeline;
//! use dinotax_ingest::snapshot::SnapshotWriter;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let source = Arc::new(PbdbClient::new(&config)?);
//!     let pipeline = IngestionPipeline::new(config, source)?;
//!
//!     let outcome = pipeline.run().await?;
//!     SnapshotWriter::new("./data/dinotax").write(&outcome)?;
//!     println!("{}", outcome.stats.summary());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod lineage;
pub mod measurements;
pub mod models;
pub mod pbdb;
pub mod pipeline;
pub mod review;
pub mod snapshot;
pub mod source;
pub mod tree;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use pipeline::{IngestOutcome, IngestionPipeline};
pub use source::TaxonSource;
pub use tree::{ConflictPolicy, TaxonomyTree};

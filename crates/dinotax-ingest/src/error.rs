//! Error types for taxonomy ingestion
//!
//! Errors split into two families. Unit failures (one group fetch, one species
//! resolution, one lineage merge) are logged and counted while the run carries on.
//! Everything else is fatal to the call that raised it.

use crate::models::TaxonId;
use crate::pipeline::UnitFailure;
use dinotax_common::DinotaxError;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// A source call failed, returned a non-success status, or sent an unreadable body
    #[error("Source unavailable for {unit}: {reason}")]
    SourceUnavailable { unit: String, reason: String },

    /// The ancestor walk did not reach the root within the depth bound
    #[error("Lineage of taxon {species_id} exceeded {max_depth} steps without reaching the root")]
    LineageTooDeep { species_id: TaxonId, max_depth: usize },

    /// A taxon would be attached under a second, different parent
    #[error(
        "Taxon {taxon_id} is already placed under {existing_parent}; refusing to attach it under {attempted_parent}"
    )]
    InconsistentParentage {
        taxon_id: TaxonId,
        existing_parent: TaxonId,
        attempted_parent: TaxonId,
    },

    /// The designated root is absent from the taxon set
    #[error("Root taxon '{0}' not found in the taxon set")]
    RootNotFound(String),

    /// A lineage that does not start at the root taxon
    #[error("Lineage of taxon {species_id} starts at {first}, not at the root taxon")]
    DetachedLineage { species_id: TaxonId, first: TaxonId },

    /// The first lookup of a species found nothing
    #[error("No taxon record found for {0}")]
    UnresolvedSpecies(String),

    /// A second accepted name resolved to a taxon that already has a species record
    #[error("Species {species} resolves to taxon {taxon_id}, already recorded under another name")]
    DuplicateTaxon { species: String, taxon_id: TaxonId },

    /// Every species failed, or none were selected, so there is nothing to build
    #[error("No species could be resolved ({processed} processed, {} units failed)", .failures.len())]
    NothingResolved {
        processed: usize,
        failures: Vec<UnitFailure>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Common(#[from] DinotaxError),
}

impl IngestError {
    pub fn source_unavailable(unit: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            unit: unit.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for failures scoped to a single unit of work
    pub fn is_unit_failure(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. }
                | Self::LineageTooDeep { .. }
                | Self::InconsistentParentage { .. }
                | Self::DetachedLineage { .. }
                | Self::UnresolvedSpecies(_)
                | Self::DuplicateTaxon { .. }
        )
    }

    /// Short machine-readable label, used as a counter key in run reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::LineageTooDeep { .. } => "lineage_too_deep",
            Self::InconsistentParentage { .. } => "inconsistent_parentage",
            Self::RootNotFound(_) => "root_not_found",
            Self::DetachedLineage { .. } => "detached_lineage",
            Self::UnresolvedSpecies(_) => "unresolved_species",
            Self::DuplicateTaxon { .. } => "duplicate_taxon",
            Self::NothingResolved { .. } => "nothing_resolved",
            Self::Config(_) => "config",
            Self::Http(_) => "http",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Toml(_) => "toml",
            Self::Common(_) => "common",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_failures_are_not_fatal() {
        let err = IngestError::source_unavailable("group Theropoda", "503 Service Unavailable");
        assert!(err.is_unit_failure());
        assert_eq!(err.kind(), "source_unavailable");
        assert_eq!(
            err.to_string(),
            "Source unavailable for group Theropoda: 503 Service Unavailable"
        );

        let err = IngestError::LineageTooDeep {
            species_id: "57221".into(),
            max_depth: 50,
        };
        assert!(err.is_unit_failure());
    }

    #[test]
    fn test_root_not_found_is_fatal() {
        let err = IngestError::RootNotFound("Dinosauria".to_string());
        assert!(!err.is_unit_failure());
        assert_eq!(err.to_string(), "Root taxon 'Dinosauria' not found in the taxon set");
    }

    #[test]
    fn test_nothing_resolved_reports_failure_count() {
        let err = IngestError::NothingResolved {
            processed: 0,
            failures: vec![UnitFailure {
                unit: "group Theropoda".to_string(),
                kind: "source_unavailable".to_string(),
                message: "simulated outage".to_string(),
            }],
        };
        assert!(!err.is_unit_failure());
        assert_eq!(err.kind(), "nothing_resolved");
        assert_eq!(err.to_string(), "No species could be resolved (0 processed, 1 units failed)");
    }
}

//! Taxon source abstraction
//!
//! The pipeline only talks to a `TaxonSource`. `PbdbClient` is the production
//! implementation; `StaticSource` serves fixtures from memory.

use crate::error::{IngestError, Result};
use crate::models::{CandidateSpecies, TaxonId, TaxonRecord, SPECIES_RANK};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Read access to an external taxonomy
///
/// "Not found" is `Ok(None)` or an empty list. `Err` is reserved for calls that
/// could not be completed and is always scoped to the single group or taxon asked for.
#[async_trait]
pub trait TaxonSource: Send + Sync {
    /// Accepted fossil species under a higher taxon, older than `min_ma`
    async fn fetch_species_by_group(
        &self,
        group: &str,
        min_ma: f64,
    ) -> Result<Vec<CandidateSpecies>>;

    async fn fetch_taxon_by_id(&self, id: &TaxonId) -> Result<Option<TaxonRecord>>;

    /// Resolve a scientific name to its canonical record
    async fn fetch_species_by_name(&self, name: &str) -> Result<Option<TaxonRecord>>;
}

/// In-memory source
#[derive(Debug, Default)]
pub struct StaticSource {
    groups: HashMap<String, Vec<CandidateSpecies>>,
    taxa: HashMap<TaxonId, TaxonRecord>,
    names: HashMap<String, TaxonId>,
    failing_groups: HashSet<String>,
    failing_taxa: HashSet<TaxonId>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: impl Into<String>, species: Vec<CandidateSpecies>) -> Self {
        self.groups.insert(group.into(), species);
        self
    }

    /// Register a taxon; species-rank records also become resolvable by name
    pub fn with_taxon(mut self, record: TaxonRecord) -> Self {
        if record.rank == SPECIES_RANK {
            self.names.insert(record.name.clone(), record.id.clone());
        }
        self.taxa.insert(record.id.clone(), record);
        self
    }

    pub fn with_taxa(self, records: impl IntoIterator<Item = TaxonRecord>) -> Self {
        records.into_iter().fold(self, Self::with_taxon)
    }

    /// Resolve `name` to an already registered taxon, as a junior synonym would
    pub fn with_synonym(mut self, name: impl Into<String>, id: impl Into<TaxonId>) -> Self {
        self.names.insert(name.into(), id.into());
        self
    }

    /// Group fetches for `group` fail with `SourceUnavailable`
    pub fn with_failing_group(mut self, group: impl Into<String>) -> Self {
        self.failing_groups.insert(group.into());
        self
    }

    /// Lookups that land on `id`, by id or by name, fail with `SourceUnavailable`
    pub fn with_failing_taxon(mut self, id: impl Into<TaxonId>) -> Self {
        self.failing_taxa.insert(id.into());
        self
    }

    /// Total number of calls served, failed ones included
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaxonSource for StaticSource {
    async fn fetch_species_by_group(
        &self,
        group: &str,
        min_ma: f64,
    ) -> Result<Vec<CandidateSpecies>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_groups.contains(group) {
            return Err(IngestError::source_unavailable(
                format!("group {}", group),
                "simulated outage",
            ));
        }

        Ok(self
            .groups
            .get(group)
            .map(|species| {
                species
                    .iter()
                    .filter(|s| s.max_ma.map_or(true, |max| max >= min_ma))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_taxon_by_id(&self, id: &TaxonId) -> Result<Option<TaxonRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_taxa.contains(id) {
            return Err(IngestError::source_unavailable(
                format!("taxon {}", id),
                "simulated outage",
            ));
        }
        Ok(self.taxa.get(id).cloned())
    }

    async fn fetch_species_by_name(&self, name: &str) -> Result<Option<TaxonRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(id) = self.names.get(name) else {
            return Ok(None);
        };
        if self.failing_taxa.contains(id) {
            return Err(IngestError::source_unavailable(
                format!("species {}", name),
                "simulated outage",
            ));
        }
        Ok(self.taxa.get(id).cloned())
    }
}

//! Lineage resolution
//!
//! Walks parent links from a species up to the root, one point lookup per
//! step. Steps within a lineage are strictly sequential; separate species can
//! be resolved concurrently against the same resolver.

use crate::cache::TaxonCache;
use crate::error::{IngestError, Result};
use crate::models::{Lineage, TaxonId, TaxonRecord};
use crate::source::TaxonSource;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct LineageResolver {
    source: Arc<dyn TaxonSource>,
    cache: Arc<TaxonCache>,
    root_name: String,
    max_depth: usize,
}

impl LineageResolver {
    pub fn new(
        source: Arc<dyn TaxonSource>,
        cache: Arc<TaxonCache>,
        root_name: impl Into<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            source,
            cache,
            root_name: root_name.into(),
            max_depth,
        }
    }

    pub fn cache(&self) -> &Arc<TaxonCache> {
        &self.cache
    }

    /// One step of the walk: cached record, else a source lookup
    async fn lookup(&self, id: &TaxonId) -> Result<Option<TaxonRecord>> {
        if let Some(record) = self.cache.get(id) {
            return Ok(Some(record));
        }

        let record = self.source.fetch_taxon_by_id(id).await?;
        if let Some(record) = &record {
            self.cache.insert(record.clone());
        }
        Ok(record)
    }

    /// Ancestor chain of `species_id`, root first
    ///
    /// The walk ends at the root name, at a record with no parent, or at the
    /// first lookup that fails or finds nothing. Only a failure on the species
    /// itself is an error; later failures return the partial chain.
    pub async fn resolve_lineage(&self, species_id: &TaxonId) -> Result<Lineage> {
        let mut chain: VecDeque<TaxonId> = VecDeque::new();
        let mut next = Some(species_id.clone());
        let mut lookups = 0usize;

        while let Some(id) = next.take() {
            if lookups == self.max_depth {
                return Err(IngestError::LineageTooDeep {
                    species_id: species_id.clone(),
                    max_depth: self.max_depth,
                });
            }
            lookups += 1;

            let record = match self.lookup(&id).await {
                Ok(Some(record)) => record,
                Ok(None) if chain.is_empty() => {
                    return Err(IngestError::UnresolvedSpecies(id.to_string()));
                }
                Ok(None) => {
                    warn!(species_id = %species_id, taxon_id = %id, "Ancestor not found; keeping partial lineage");
                    break;
                }
                Err(e) if chain.is_empty() => return Err(e),
                Err(e) => {
                    warn!(species_id = %species_id, taxon_id = %id, error = %e, "Ancestor lookup failed; keeping partial lineage");
                    break;
                }
            };

            chain.push_front(record.id.clone());

            if record.name == self.root_name {
                break;
            }

            next = record.parent_id;
            if next.is_none() {
                debug!(species_id = %species_id, taxon_id = %record.id, "Parent chain ended before the root");
            }
        }

        Lineage::new(chain.into()).ok_or_else(|| IngestError::UnresolvedSpecies(species_id.to_string()))
    }

    /// Resolve a scientific name to its record and lineage
    pub async fn resolve_species(&self, name: &str) -> Result<(TaxonRecord, Lineage)> {
        let record = self
            .source
            .fetch_species_by_name(name)
            .await?
            .ok_or_else(|| IngestError::UnresolvedSpecies(name.to_string()))?;

        self.cache.insert(record.clone());
        let lineage = self.resolve_lineage(&record.id).await?;
        Ok((record, lineage))
    }
}

//! Taxonomy ingestion pipeline
//!
//! Orchestrates the full run from group queries to a merged taxonomy tree.
//!
//! Steps:
//! 1. Fetch candidate species for every configured group (concurrent)
//! 2. Filter and deduplicate, then order alphabetically
//! 3. Resolve each species to its lineage (concurrent, throttled upstream)
//! 4. Merge lineages into one tree
//! 5. Assemble taxon and species records for persistence
//!
//! A failed group or species is logged, counted and skipped. Only configuration
//! problems, a missing root, or a run where no species resolved at all abort it.

use crate::cache::TaxonCache;
use crate::config::IngestConfig;
use crate::dedup::deduplicate;
use crate::error::{IngestError, Result};
use crate::filter::{FilterStats, SpeciesFilter};
use crate::lineage::LineageResolver;
use crate::measurements::MeasurementTable;
use crate::models::{AcceptedSpecies, CandidateSpecies, Lineage, SpeciesRecord, TaxonId, TaxonRecord};
use crate::source::TaxonSource;
use crate::tree::{build_tree, TaxonomyTree, TreeOptions};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A unit of work that was abandoned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    /// "group Theropoda", "species Tyrannosaurus rex", ...
    pub unit: String,
    pub kind: String,
    pub message: String,
}

impl UnitFailure {
    fn new(unit: impl Into<String>, error: &IngestError) -> Self {
        Self {
            unit: unit.into(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Output of the fetch, filter and dedup stages
#[derive(Debug, Clone, Default)]
pub struct SpeciesSelection {
    /// Accepted species in alphabetical order, after `species_limit`
    pub accepted: Vec<AcceptedSpecies>,
    pub groups_requested: usize,
    pub groups_failed: usize,
    pub candidates: usize,
    pub excluded: FilterStats,
    pub duplicates: usize,
    pub failures: Vec<UnitFailure>,
}

/// Aggregate counts of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub groups_requested: usize,
    pub groups_failed: usize,
    pub candidates: usize,
    pub excluded: usize,
    pub duplicates: usize,
    /// Species that entered lineage resolution
    pub processed: usize,
    /// Species placed in the tree
    pub succeeded: usize,
    /// Species that failed resolution or were rejected by the tree builder
    pub failed: usize,
    pub taxa: usize,
    pub conflicts: usize,
}

impl RunStats {
    /// Check if every unit of the run went through
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.groups_failed == 0
    }

    /// Get a summary message
    pub fn summary(&self) -> String {
        format!(
            "Processed {} species from {} groups: {} succeeded, {} failed ({} groups failed, {} taxa, {} conflicts)",
            self.processed,
            self.groups_requested,
            self.succeeded,
            self.failed,
            self.groups_failed,
            self.taxa,
            self.conflicts
        )
    }
}

/// Everything a run produces
#[derive(Debug)]
pub struct IngestOutcome {
    pub tree: TaxonomyTree,
    /// One record per taxon, parent as placed in the tree, sorted by id
    pub taxa: Vec<TaxonRecord>,
    /// Sorted by name
    pub species: Vec<SpeciesRecord>,
    pub stats: RunStats,
    pub failures: Vec<UnitFailure>,
}

struct Resolved {
    species: AcceptedSpecies,
    record: TaxonRecord,
    lineage: Lineage,
}

pub struct IngestionPipeline {
    config: IngestConfig,
    source: Arc<dyn TaxonSource>,
    filter: SpeciesFilter,
    cache: Arc<TaxonCache>,
    measurements: MeasurementTable,
}

impl IngestionPipeline {
    /// Create a new pipeline; validates the config and loads rule and measurement files
    pub fn new(config: IngestConfig, source: Arc<dyn TaxonSource>) -> Result<Self> {
        config.validate()?;

        let rules = config.load_filter_rules()?;
        info!(version = rules.version, "Using filter rules");

        let measurements = match &config.measurements_path {
            Some(path) => MeasurementTable::from_json_file(path)?,
            None => MeasurementTable::new(),
        };

        Ok(Self {
            filter: SpeciesFilter::new(&rules),
            config,
            source,
            cache: Arc::new(TaxonCache::new()),
            measurements,
        })
    }

    pub fn with_measurements(mut self, measurements: MeasurementTable) -> Self {
        self.measurements = measurements;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<TaxonCache> {
        &self.cache
    }

    /// Resolver sharing this pipeline's source and cache
    pub fn resolver(&self) -> LineageResolver {
        LineageResolver::new(
            Arc::clone(&self.source),
            Arc::clone(&self.cache),
            self.config.root_name.clone(),
            self.config.max_lineage_depth,
        )
    }

    /// Fetch every group; failed groups contribute nothing
    async fn fetch_candidates(&self, failures: &mut Vec<UnitFailure>) -> (Vec<CandidateSpecies>, usize) {
        let min_ma = self.config.min_ma;

        let results = stream::iter(self.config.groups.iter().cloned())
            .map(|group| {
                let source = Arc::clone(&self.source);
                async move {
                    let result = source.fetch_species_by_group(&group, min_ma).await;
                    (group, result)
                }
            })
            .buffered(self.config.group_concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut candidates = Vec::new();
        let mut failed = 0;
        for (group, result) in results {
            match result {
                Ok(species) => {
                    info!(group = %group, count = species.len(), "✓ Group fetched");
                    candidates.extend(species);
                }
                Err(e) => {
                    warn!(group = %group, error = %e, "✗ Failed to fetch group");
                    failures.push(UnitFailure::new(format!("group {}", group), &e));
                    failed += 1;
                }
            }
        }

        (candidates, failed)
    }

    /// Fetch, filter and deduplicate
    pub async fn collect_species(&self) -> Result<SpeciesSelection> {
        info!(groups = self.config.groups.len(), min_ma = self.config.min_ma, "Phase 1: Fetching candidate species");
        let mut failures = Vec::new();
        let (candidates, groups_failed) = self.fetch_candidates(&mut failures).await;
        let candidate_count = candidates.len();
        info!(total = candidate_count, "Total species before filtering");

        info!("Phase 2: Filtering and deduplicating");
        let filtered = self.filter.apply(candidates);
        info!(
            kept = filtered.kept.len(),
            excluded = filtered.stats.total(),
            ichnogenus = filtered.stats.ichnogenus,
            ichno_suffix = filtered.stats.ichno_suffix,
            egg_fossil = filtered.stats.egg_fossil,
            modern_bird = filtered.stats.modern_bird,
            "Filtered candidates"
        );

        let deduped = deduplicate(filtered.kept);
        info!(unique = deduped.accepted.len(), duplicates = deduped.duplicates, "Removed duplicates");

        let mut accepted = deduped.accepted;
        accepted.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(limit) = self.config.species_limit {
            if accepted.len() > limit {
                info!(limit, available = accepted.len(), "Applying species limit");
                accepted.truncate(limit);
            }
        }

        Ok(SpeciesSelection {
            accepted,
            groups_requested: self.config.groups.len(),
            groups_failed,
            candidates: candidate_count,
            excluded: filtered.stats,
            duplicates: deduped.duplicates,
            failures,
        })
    }

    /// Resolve every species; results keep the input order
    async fn resolve_all(
        &self,
        species: Vec<AcceptedSpecies>,
        failures: &mut Vec<UnitFailure>,
    ) -> Vec<Resolved> {
        let total = species.len();
        let resolver = self.resolver();
        let resolver = &resolver;

        let results = stream::iter(species)
            .map(|species| async move {
                let result = resolver.resolve_species(&species.name).await;
                (species, result)
            })
            .buffered(self.config.species_concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut resolved = Vec::with_capacity(total);
        for (species, result) in results {
            match result {
                Ok((record, lineage)) => {
                    debug!(species = %species.name, taxon_id = %record.id, depth = lineage.len(), "Lineage resolved");
                    resolved.push(Resolved {
                        species,
                        record,
                        lineage,
                    });
                }
                Err(e) => {
                    warn!(species = %species.name, error = %e, "✗ Failed to resolve species");
                    failures.push(UnitFailure::new(format!("species {}", species.name), &e));
                }
            }
        }

        info!(resolved = resolved.len(), failed = total - resolved.len(), cached_taxa = self.cache.len(), "Lineage resolution complete");
        resolved
    }

    /// Run the full ingestion pipeline
    pub async fn run(&self) -> Result<IngestOutcome> {
        info!(
            root = %self.config.root_name,
            policy = %self.config.conflict_policy,
            "Starting taxonomy ingestion pipeline"
        );

        let selection = self.collect_species().await?;
        let mut failures = selection.failures;
        let processed = selection.accepted.len();

        info!(species = processed, "Phase 3: Resolving lineages");
        let resolved = self.resolve_all(selection.accepted, &mut failures).await;
        if resolved.is_empty() {
            return Err(IngestError::NothingResolved { processed, failures });
        }

        info!("Phase 4: Building taxonomy tree");
        let lineages: Vec<Lineage> = resolved.iter().map(|r| r.lineage.clone()).collect();
        let taxon_info = self.cache.snapshot();
        let options = TreeOptions::new(self.config.root_name.clone(), self.config.conflict_policy);
        let build = build_tree(&lineages, &taxon_info, &options)?;

        let mut rejected: HashSet<TaxonId> = HashSet::new();
        for (species_id, e) in &build.rejected {
            failures.push(UnitFailure::new(format!("taxon {}", species_id), e));
            rejected.insert(species_id.clone());
        }

        info!("Phase 5: Assembling records");
        let species = self.species_records(resolved, &rejected, &mut failures);
        let tree = build.tree;
        let taxa = tree.to_records();

        let stats = RunStats {
            groups_requested: selection.groups_requested,
            groups_failed: selection.groups_failed,
            candidates: selection.candidates,
            excluded: selection.excluded.total(),
            duplicates: selection.duplicates,
            processed,
            succeeded: species.len(),
            failed: processed - species.len(),
            taxa: taxa.len(),
            conflicts: tree.conflicts().len(),
        };

        if stats.is_success() {
            info!("{}", stats.summary());
        } else {
            warn!("{}", stats.summary());
        }

        Ok(IngestOutcome {
            tree,
            taxa,
            species,
            stats,
            failures,
        })
    }

    fn species_records(
        &self,
        resolved: Vec<Resolved>,
        rejected: &HashSet<TaxonId>,
        failures: &mut Vec<UnitFailure>,
    ) -> Vec<SpeciesRecord> {
        let mut seen: HashSet<TaxonId> = HashSet::new();
        let mut records = Vec::with_capacity(resolved.len());

        for Resolved { species, record, lineage } in resolved {
            if rejected.contains(lineage.species()) {
                continue;
            }
            if !seen.insert(record.id.clone()) {
                warn!(species = %species.name, taxon_id = %record.id, "Species resolves to a taxon already recorded; skipping");
                let e = IngestError::DuplicateTaxon {
                    species: species.name.clone(),
                    taxon_id: record.id,
                };
                failures.push(UnitFailure::new(format!("species {}", species.name), &e));
                continue;
            }

            let mut species_record = SpeciesRecord::new(record.id, &species, lineage);
            if let Some(measurement) = self.measurements.lookup(&species.name) {
                species_record.length = measurement.length;
                species_record.weight = measurement.weight;
            }
            records.push(species_record);
        }

        records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        records
    }
}

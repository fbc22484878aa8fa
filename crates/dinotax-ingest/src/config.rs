//! Ingestion configuration
//!
//! Defaults live in constants below. A TOML file may override any subset of
//! fields, and `DINOTAX_*` environment variables override both.

use crate::error::{IngestError, Result};
use crate::filter::FilterRules;
use crate::tree::ConflictPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Ingestion Configuration Constants
// ============================================================================

/// PBDB data service, version 1.2
pub const DEFAULT_BASE_URL: &str = "https://paleobiodb.org/data1.2";

/// Per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Higher-taxon groups queried for species. They overlap on purpose.
pub const DEFAULT_GROUPS: &[&str] = &[
    "Saurischia",
    "Ornithischia",
    "Theropoda",
    "Sauropodomorpha",
    "Ceratopsia",
    "Ornithopoda",
    "Thyreophora",
];

/// First-appearance cutoff in Ma (end-Cretaceous).
pub const DEFAULT_MIN_MA: f64 = 66.0;

/// Name of the taxon every lineage must end at.
pub const DEFAULT_ROOT_NAME: &str = "Dinosauria";

/// Upper bound on ancestor lookups per species.
pub const DEFAULT_MAX_LINEAGE_DEPTH: usize = 50;

/// Group queries in flight at once.
pub const DEFAULT_GROUP_CONCURRENCY: usize = 2;

/// Species resolved in parallel.
pub const DEFAULT_SPECIES_CONCURRENCY: usize = 4;

/// Source requests in flight at once, across all stages.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Minimum spacing between consecutive source requests, in milliseconds.
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 250;

/// Full configuration of an ingestion run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// Base URL of the PBDB data service
    pub base_url: String,
    pub timeout_secs: u64,
    pub groups: Vec<String>,
    pub min_ma: f64,
    pub root_name: String,
    pub max_lineage_depth: usize,
    pub group_concurrency: usize,
    pub species_concurrency: usize,
    pub max_in_flight: usize,
    pub request_interval_ms: u64,
    pub conflict_policy: ConflictPolicy,
    /// Only resolve the first N accepted species (alphabetical), for trial runs
    pub species_limit: Option<usize>,
    pub filter: FilterRules,
    /// Replaces `filter` when set
    pub filter_rules_path: Option<PathBuf>,
    /// JSON list of `{name, length, weight}` measurement entries
    pub measurements_path: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            groups: DEFAULT_GROUPS.iter().map(|g| g.to_string()).collect(),
            min_ma: DEFAULT_MIN_MA,
            root_name: DEFAULT_ROOT_NAME.to_string(),
            max_lineage_depth: DEFAULT_MAX_LINEAGE_DEPTH,
            group_concurrency: DEFAULT_GROUP_CONCURRENCY,
            species_concurrency: DEFAULT_SPECIES_CONCURRENCY,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
            conflict_policy: ConflictPolicy::default(),
            species_limit: None,
            filter: FilterRules::default(),
            filter_rules_path: None,
            measurements_path: None,
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `DINOTAX_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    /// Load a TOML file; fields it omits keep their defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay environment variables onto `self`
    ///
    /// Environment variables:
    /// - `DINOTAX_BASE_URL`, `DINOTAX_TIMEOUT_SECS`
    /// - `DINOTAX_GROUPS` (comma separated), `DINOTAX_MIN_MA`
    /// - `DINOTAX_ROOT_NAME`, `DINOTAX_MAX_LINEAGE_DEPTH`
    /// - `DINOTAX_GROUP_CONCURRENCY`, `DINOTAX_SPECIES_CONCURRENCY`
    /// - `DINOTAX_MAX_IN_FLIGHT`, `DINOTAX_REQUEST_INTERVAL_MS`
    /// - `DINOTAX_CONFLICT_POLICY` (strict, permissive)
    /// - `DINOTAX_SPECIES_LIMIT`
    /// - `DINOTAX_FILTER_RULES`, `DINOTAX_MEASUREMENTS` (paths)
    ///
    /// A variable that is set but does not parse is a `Config` error.
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var("DINOTAX_BASE_URL") {
            self.base_url = url;
        }
        if let Some(v) = env_parse("DINOTAX_TIMEOUT_SECS")? {
            self.timeout_secs = v;
        }
        if let Ok(groups) = std::env::var("DINOTAX_GROUPS") {
            self.groups = groups
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = env_parse("DINOTAX_MIN_MA")? {
            self.min_ma = v;
        }
        if let Ok(name) = std::env::var("DINOTAX_ROOT_NAME") {
            self.root_name = name;
        }
        if let Some(v) = env_parse("DINOTAX_MAX_LINEAGE_DEPTH")? {
            self.max_lineage_depth = v;
        }
        if let Some(v) = env_parse("DINOTAX_GROUP_CONCURRENCY")? {
            self.group_concurrency = v;
        }
        if let Some(v) = env_parse("DINOTAX_SPECIES_CONCURRENCY")? {
            self.species_concurrency = v;
        }
        if let Some(v) = env_parse("DINOTAX_MAX_IN_FLIGHT")? {
            self.max_in_flight = v;
        }
        if let Some(v) = env_parse("DINOTAX_REQUEST_INTERVAL_MS")? {
            self.request_interval_ms = v;
        }
        if let Some(v) = env_parse("DINOTAX_CONFLICT_POLICY")? {
            self.conflict_policy = v;
        }
        if let Some(v) = env_parse("DINOTAX_SPECIES_LIMIT")? {
            self.species_limit = Some(v);
        }
        if let Ok(path) = std::env::var("DINOTAX_FILTER_RULES") {
            self.filter_rules_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("DINOTAX_MEASUREMENTS") {
            self.measurements_path = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(IngestError::config("base_url cannot be empty"));
        }
        if self.groups.is_empty() {
            return Err(IngestError::config("at least one group must be configured"));
        }
        if self.root_name.trim().is_empty() {
            return Err(IngestError::config("root_name cannot be empty"));
        }
        if !self.min_ma.is_finite() || self.min_ma < 0.0 {
            return Err(IngestError::config(format!(
                "min_ma must be a non-negative number, got {}",
                self.min_ma
            )));
        }
        if self.max_lineage_depth == 0 {
            return Err(IngestError::config("max_lineage_depth must be greater than 0"));
        }
        if self.group_concurrency == 0 || self.species_concurrency == 0 || self.max_in_flight == 0
        {
            return Err(IngestError::config("concurrency limits must be greater than 0"));
        }
        if self.species_concurrency > self.max_in_flight {
            tracing::warn!(
                species_concurrency = self.species_concurrency,
                max_in_flight = self.max_in_flight,
                "Species concurrency exceeds the request cap; extra workers will queue on the throttle"
            );
        }
        Ok(())
    }

    /// Filter rules in effect: the external rules file when configured, else `filter`
    pub fn load_filter_rules(&self) -> Result<FilterRules> {
        match &self.filter_rules_path {
            Some(path) => FilterRules::from_toml_file(path),
            None => Ok(self.filter.clone()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_species_limit(mut self, limit: usize) -> Self {
        self.species_limit = Some(limit);
        self
    }

    pub fn with_max_lineage_depth(mut self, depth: usize) -> Self {
        self.max_lineage_depth = depth;
        self
    }

    /// Set the request spacing; zero disables it (tests, local mirrors)
    pub fn with_request_interval(mut self, interval_ms: u64) -> Self {
        self.request_interval_ms = interval_ms;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| IngestError::config(format!("Invalid value for {}: {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}

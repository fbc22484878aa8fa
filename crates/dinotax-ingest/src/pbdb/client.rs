//! HTTP client for the PBDB data service
//!
//! Best effort and retry free. Every failure is reported as `SourceUnavailable`
//! for the one group or taxon being fetched; the caller decides whether to carry on.

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::models::{CandidateSpecies, TaxonId, TaxonRecord};
use crate::pbdb::endpoints::{self, QueryParams};
use crate::pbdb::throttle::RequestThrottle;
use crate::pbdb::types::{CompactTaxon, ListedSpecies, NamedTaxon, RecordsResponse};
use crate::source::TaxonSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("dinotax-ingest/", env!("CARGO_PKG_VERSION"));

pub struct PbdbClient {
    client: Client,
    base_url: String,
    throttle: Arc<RequestThrottle>,
}

impl PbdbClient {
    /// Create a client with its own throttle
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let throttle = Arc::new(RequestThrottle::new(
            config.max_in_flight,
            config.request_interval(),
        ));
        Self::with_throttle(config, throttle)
    }

    /// Create a client that shares `throttle` with other callers
    pub fn with_throttle(config: &IngestConfig, throttle: Arc<RequestThrottle>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            throttle,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_records<T: DeserializeOwned>(
        &self,
        unit: &str,
        url: &str,
        params: &QueryParams,
    ) -> Result<Vec<T>> {
        let _permit = self.throttle.acquire().await?;
        debug!(unit, url, "PBDB request");

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IngestError::source_unavailable(unit, e))?;

        let body: RecordsResponse<T> = response
            .json()
            .await
            .map_err(|e| IngestError::source_unavailable(unit, e))?;

        Ok(body.into_records())
    }
}

#[async_trait]
impl TaxonSource for PbdbClient {
    async fn fetch_species_by_group(
        &self,
        group: &str,
        min_ma: f64,
    ) -> Result<Vec<CandidateSpecies>> {
        let unit = format!("group {}", group);
        let url = endpoints::taxa_list_url(&self.base_url);
        let params = endpoints::group_species_params(group, min_ma);

        let rows: Vec<ListedSpecies> = self.get_records(&unit, &url, &params).await?;
        if rows.is_empty() {
            info!(group, "No species found");
        } else {
            info!(group, count = rows.len(), "Fetched species");
        }

        Ok(rows.into_iter().map(|row| row.into_candidate(group)).collect())
    }

    async fn fetch_taxon_by_id(&self, id: &TaxonId) -> Result<Option<TaxonRecord>> {
        let unit = format!("taxon {}", id);
        let url = endpoints::taxa_single_url(&self.base_url);
        let params = endpoints::taxon_by_id_params(id.as_str());

        let rows: Vec<CompactTaxon> = self.get_records(&unit, &url, &params).await?;
        let record = rows.into_iter().next().map(|row| row.into_record(id));
        if record.is_none() {
            debug!(taxon_id = %id, "No data found for taxon");
        }
        Ok(record)
    }

    async fn fetch_species_by_name(&self, name: &str) -> Result<Option<TaxonRecord>> {
        let unit = format!("species {}", name);
        let url = endpoints::taxa_list_url(&self.base_url);
        let params = endpoints::species_by_name_params(name);

        let rows: Vec<NamedTaxon> = self.get_records(&unit, &url, &params).await?;
        let record = rows.into_iter().next().map(NamedTaxon::into_record);
        if record.is_none() {
            debug!(species = name, "No data found for species");
        }
        Ok(record)
    }
}

//! PBDB response types
//!
//! Two vocabularies come back from the service. List queries with `vocab=pbdb`
//! use long field names (`taxon_name`, `parent_no`); point lookups use compact
//! codes (`nam`, `rnk`, `par`) and prefix identifiers with `txn:`. Numeric fields
//! arrive as either JSON numbers or strings, so both are accepted.

use crate::models::{CandidateSpecies, TaxonId, TaxonRecord};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Envelope of every PBDB JSON response. No `records` means nothing matched.
#[derive(Debug, Deserialize)]
pub struct RecordsResponse<T> {
    pub records: Option<Vec<T>>,
}

impl<T> RecordsResponse<T> {
    pub fn into_records(self) -> Vec<T> {
        self.records.unwrap_or_default()
    }
}

/// Species row from a group query
#[derive(Debug, Clone, Deserialize)]
pub struct ListedSpecies {
    pub taxon_name: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub taxon_rank: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub parent_name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub family: Option<String>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub firstapp_max_ma: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub lastapp_min_ma: Option<f64>,
}

impl ListedSpecies {
    pub fn into_candidate(self, group: &str) -> CandidateSpecies {
        CandidateSpecies {
            name: self.taxon_name,
            rank: self.taxon_rank.unwrap_or_else(|| "species".to_string()),
            parent: self.parent_name.unwrap_or_default(),
            group: group.to_string(),
            family: self.family,
            max_ma: self.firstapp_max_ma,
            min_ma: self.lastapp_min_ma,
        }
    }
}

/// Row from an exact-name lookup
#[derive(Debug, Clone, Deserialize)]
pub struct NamedTaxon {
    #[serde(deserialize_with = "de_id")]
    pub orig_no: String,
    pub taxon_name: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub taxon_rank: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub parent_no: Option<String>,
}

impl NamedTaxon {
    pub fn into_record(self) -> TaxonRecord {
        TaxonRecord::new(
            self.orig_no,
            self.taxon_name,
            self.taxon_rank.as_deref().map(rank_code).unwrap_or(0),
            self.parent_no.map(TaxonId::from),
        )
    }
}

/// Row from a point lookup, compact vocabulary
#[derive(Debug, Clone, Deserialize)]
pub struct CompactTaxon {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub oid: Option<String>,
    pub nam: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub rnk: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub par: Option<String>,
}

impl CompactTaxon {
    /// Keyed by the id that was asked for, so lineages line up with parent links
    pub fn into_record(self, requested: &TaxonId) -> TaxonRecord {
        TaxonRecord::new(
            requested.clone(),
            self.nam,
            self.rnk.as_deref().map(rank_code).unwrap_or(0),
            self.par.map(TaxonId::from),
        )
    }
}

/// Numeric rank code for a PBDB rank; numeric strings pass through, unknown is 0
pub fn rank_code(rank: &str) -> i32 {
    let rank = rank.trim();
    if let Ok(code) = rank.parse::<i32>() {
        return code;
    }

    match rank.to_lowercase().as_str() {
        "subspecies" => 2,
        "species" => 3,
        "subgenus" => 4,
        "genus" => 5,
        "subtribe" => 6,
        "tribe" => 7,
        "subfamily" => 8,
        "family" => 9,
        "superfamily" => 10,
        "infraorder" => 11,
        "suborder" => 12,
        "order" => 13,
        "superorder" => 14,
        "infraclass" => 15,
        "subclass" => 16,
        "class" => 17,
        "superclass" => 18,
        "subphylum" => 19,
        "phylum" => 20,
        "superphylum" => 21,
        "subkingdom" => 22,
        "kingdom" => 23,
        "unranked clade" | "unranked" => 25,
        "informal" => 26,
        _ => 0,
    }
}

/// "txn:38613" -> "38613"; ids of 0 or blank mean "none"
fn normalize_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    let id = id.strip_prefix("txn:").unwrap_or(id);
    if id.is_empty() || id == "0" {
        None
    } else {
        Some(id.to_string())
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn de_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(value_to_string))
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_string(deserializer)?.and_then(|s| normalize_id(&s)))
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    de_opt_id(deserializer)?.ok_or_else(|| serde::de::Error::custom("missing taxon identifier"))
}

fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

//! Taxonomy data models
//!
//! Candidates and lineages are produced and consumed within one run. Taxon and
//! species records are the durable output handed to persistence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rank code the source uses for species
pub const SPECIES_RANK: i32 = 3;

/// Opaque taxon identifier, unique within the source's namespace
///
/// Always stored in bare form ("38613", never "txn:38613").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonId(String);

impl TaxonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaxonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaxonId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A taxon as known to the source: name, numeric rank and immediate parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonRecord {
    pub id: TaxonId,
    pub name: String,
    /// Source rank code; lower is more specific (3 = species, 5 = genus)
    pub rank: i32,
    pub parent_id: Option<TaxonId>,
}

impl TaxonRecord {
    pub fn new(
        id: impl Into<TaxonId>,
        name: impl Into<String>,
        rank: i32,
        parent_id: Option<TaxonId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rank,
            parent_id,
        }
    }
}

/// A raw species record fetched for one higher-taxon group, before screening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSpecies {
    /// Scientific name, e.g. "Tyrannosaurus rex"
    pub name: String,
    /// Rank label as reported by the source ("species")
    pub rank: String,
    /// Name of the immediate parent taxon
    pub parent: String,
    /// Higher-taxon group this record was fetched under
    pub group: String,
    pub family: Option<String>,
    /// Oldest bound of the first appearance, Ma
    pub max_ma: Option<f64>,
    /// Youngest bound of the last appearance, Ma
    pub min_ma: Option<f64>,
}

impl CandidateSpecies {
    /// Genus token: everything before the first space
    pub fn genus(&self) -> &str {
        self.name.split(' ').next().unwrap_or_default()
    }
}

/// A candidate that survived filtering and deduplication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AcceptedSpecies(CandidateSpecies);

impl AcceptedSpecies {
    pub(crate) fn new(candidate: CandidateSpecies) -> Self {
        Self(candidate)
    }

    pub fn into_inner(self) -> CandidateSpecies {
        self.0
    }
}

impl std::ops::Deref for AcceptedSpecies {
    type Target = CandidateSpecies;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Ancestor chain of a species, root first and species last. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaxonId>", into = "Vec<TaxonId>")]
pub struct Lineage(Vec<TaxonId>);

impl TryFrom<Vec<TaxonId>> for Lineage {
    type Error = &'static str;

    fn try_from(ids: Vec<TaxonId>) -> Result<Self, Self::Error> {
        Self::new(ids).ok_or("lineage must contain at least one taxon")
    }
}

impl From<Lineage> for Vec<TaxonId> {
    fn from(lineage: Lineage) -> Self {
        lineage.0
    }
}

impl Lineage {
    /// Returns `None` for an empty chain
    pub fn new(ids: Vec<TaxonId>) -> Option<Self> {
        if ids.is_empty() {
            None
        } else {
            Some(Self(ids))
        }
    }

    pub fn ids(&self) -> &[TaxonId] {
        &self.0
    }

    /// First (most inclusive) element
    pub fn root(&self) -> &TaxonId {
        &self.0[0]
    }

    /// Last element, the species itself when the chain was fully resolved
    pub fn species(&self) -> &TaxonId {
        &self.0[self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Pairs of (parent, child) along the chain
    pub fn edges(&self) -> impl Iterator<Item = (&TaxonId, &TaxonId)> {
        self.0.windows(2).map(|pair| (&pair[0], &pair[1]))
    }
}

/// Persisted form of an accepted species, keyed by its taxon id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub id: TaxonId,
    pub name: String,
    pub taxon_id: TaxonId,
    pub lineage: Lineage,
    /// Higher-taxon group the species was fetched under
    #[serde(rename = "order")]
    pub group: String,
    pub family: Option<String>,
    pub description: String,
    pub time_range: String,
    pub first_appearance: Option<f64>,
    pub last_appearance: Option<f64>,
    pub length: Option<f64>,
    pub weight: Option<f64>,
}

impl SpeciesRecord {
    pub fn new(id: TaxonId, species: &CandidateSpecies, lineage: Lineage) -> Self {
        Self {
            taxon_id: id.clone(),
            id,
            name: species.name.clone(),
            lineage,
            group: species.group.clone(),
            family: species.family.clone(),
            description: describe(species),
            time_range: time_range(species.max_ma, species.min_ma),
            first_appearance: species.max_ma,
            last_appearance: species.min_ma,
            length: None,
            weight: None,
        }
    }
}

fn describe(species: &CandidateSpecies) -> String {
    format!(
        "Order: {}, Family: {}",
        species.group,
        species.family.as_deref().unwrap_or("N/A")
    )
}

/// "150.8 - 145 Ma", with N/A for missing bounds
pub fn time_range(max_ma: Option<f64>, min_ma: Option<f64>) -> String {
    let bound = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_else(|| "N/A".to_string());
    format!("{} - {} Ma", bound(max_ma), bound(min_ma))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn candidate(name: &str, group: &str) -> CandidateSpecies {
        CandidateSpecies {
            name: name.to_string(),
            rank: "species".to_string(),
            parent: name.split(' ').next().unwrap_or_default().to_string(),
            group: group.to_string(),
            family: None,
            max_ma: Some(68.0),
            min_ma: Some(66.0),
        }
    }

    #[test]
    fn test_genus_token() {
        assert_eq!(candidate("Tyrannosaurus rex", "Theropoda").genus(), "Tyrannosaurus");
        assert_eq!(candidate("Grallator", "Theropoda").genus(), "Grallator");
    }

    #[test]
    fn test_lineage_rejects_empty() {
        assert!(Lineage::new(vec![]).is_none());

        let lineage = Lineage::new(vec!["1".into(), "2".into(), "3".into()]).unwrap();
        assert_eq!(lineage.root().as_str(), "1");
        assert_eq!(lineage.species().as_str(), "3");
        assert_eq!(lineage.edges().count(), 2);
    }

    #[test]
    fn test_lineage_deserialize_enforces_non_empty() {
        assert!(serde_json::from_str::<Lineage>("[]").is_err());
        let lineage: Lineage = serde_json::from_str(r#"["1","2"]"#).unwrap();
        assert_eq!(lineage.len(), 2);
    }

    #[test]
    fn test_time_range_formatting() {
        assert_eq!(time_range(Some(150.8), Some(145.0)), "150.8 - 145 Ma");
        assert_eq!(time_range(None, Some(66.0)), "N/A - 66 Ma");
        assert_eq!(time_range(None, None), "N/A - N/A Ma");
    }

    #[test]
    fn test_species_record_description() {
        let mut species = candidate("Stegosaurus stenops", "Thyreophora");
        species.family = Some("Stegosauridae".to_string());
        let lineage = Lineage::new(vec!["1".into(), "42".into()]).unwrap();

        let record = SpeciesRecord::new("42".into(), &species, lineage);
        assert_eq!(record.description, "Order: Thyreophora, Family: Stegosauridae");
        assert_eq!(record.time_range, "68 - 66 Ma");
        assert_eq!(record.taxon_id, record.id);
    }

    #[test]
    fn test_taxon_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&TaxonId::new("38613")).unwrap();
        assert_eq!(json, "\"38613\"");
    }
}

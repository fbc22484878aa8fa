//! Species filter
//!
//! Screens fetched candidates down to body-fossil dinosaur species. The rule
//! lists are versioned data: the built-in set ships as `FilterRules::default()`
//! and a replacement can be loaded from TOML.

use crate::error::{IngestError, Result};
use crate::models::CandidateSpecies;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Version of the built-in rule set
pub const FILTER_RULES_VERSION: u32 = 1;

/// Trace-fossil genera (footprints and trackways)
const ICHNOGENERA: &[&str] = &[
    "Grallator",
    "Eubrontes",
    "Anomoepus",
    "Argoides",
    "Platypterna",
    "Brontopodus",
    "Megalosauripus",
    "Therangospodus",
    "Parabrontopodus",
    "Caririchnium",
    "Iguanodontipus",
    "Amblydactylus",
    "Anchisauripus",
    "Asianopodus",
    "Breviparopus",
    "Ceratopsipes",
    "Chirotherium",
    "Deltapodus",
    "Dinosauropodus",
    "Dinosauropodes",
    "Eosauropus",
    "Evazoum",
    "Gigandipus",
    "Gypsichnites",
    "Hadrosaurichnus",
    "Irenesauripus",
    "Jiayinosauripus",
    "Kayentapus",
    "Lavinipes",
    "Magnoavipes",
    "Moyenisauropus",
    "Otozoum",
    "Rotundichnus",
    "Sauropodichnus",
    "Siamopodus",
    "Stegopodus",
    "Tetrapodosaurus",
    "Tetrasauropus",
    "Tyrannosauripus",
    "Wintonopus",
    "Brontopus",
    "Limnopus",
    "Thinopus",
    "Trihamus",
    "Anatopus",
    "Argozoum",
];

const ICHNO_SUFFIXES: &[&str] = &["pes", "manus", "podus", "ichnites", "ichnus"];

const EGG_MARKER: &str = "oolithus";

/// Extant bird families that leak into theropod queries
const MODERN_BIRD_FAMILIES: &[&str] = &[
    "Accipitridae",
    "Aegithalidae",
    "Alaudidae",
    "Alcedinidae",
    "Alcidae",
    "Anatidae",
    "Anhingidae",
    "Apodidae",
    "Ardeidae",
    "Artamidae",
    "Bombycillidae",
    "Bucerotidae",
    "Burhinidae",
    "Caprimulgidae",
    "Cardinalidae",
    "Certhiidae",
    "Charadriidae",
    "Ciconiidae",
    "Cinclidae",
    "Columbidae",
    "Coraciidae",
    "Corvidae",
    "Cuculidae",
    "Diomedeidae",
    "Emberizidae",
    "Falconidae",
    "Fringillidae",
    "Gaviidae",
    "Glareolidae",
    "Gruidae",
    "Haematopodidae",
    "Hirundinidae",
    "Hydrobatidae",
    "Icteridae",
    "Indicatoridae",
    "Laniidae",
    "Laridae",
    "Maluridae",
    "Meropidae",
    "Mimidae",
    "Motacillidae",
    "Muscicapidae",
    "Nectariniidae",
    "Oriolidae",
    "Paridae",
    "Parulidae",
    "Pelecanidae",
    "Phalacrocoracidae",
    "Phasianidae",
    "Phoenicopteridae",
    "Picidae",
    "Podicipedidae",
    "Procellariidae",
    "Psittacidae",
    "Ptilonorhynchidae",
    "Rallidae",
    "Recurvirostridae",
    "Regulidae",
    "Remizidae",
    "Scolopacidae",
    "Sittidae",
    "Stercorariidae",
    "Strigidae",
    "Sturnidae",
    "Sulidae",
    "Sylviidae",
    "Threskiornithidae",
    "Timaliidae",
    "Trochilidae",
    "Troglodytidae",
    "Turdidae",
    "Tytonidae",
    "Upupidae",
    "Vireonidae",
    "Zosteropidae",
    "Cathartidae",
    "Pandionidae",
    "Sagittariidae",
    "Anhimidae",
    "Apterygidae",
];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Versioned exclusion lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    pub version: u32,
    pub ichnogenera: Vec<String>,
    /// Matched case-insensitively against the end of the full name
    pub ichno_suffixes: Vec<String>,
    /// Matched case-insensitively anywhere in the name or parent name
    pub egg_marker: String,
    pub modern_bird_families: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            version: FILTER_RULES_VERSION,
            ichnogenera: owned(ICHNOGENERA),
            ichno_suffixes: owned(ICHNO_SUFFIXES),
            egg_marker: EGG_MARKER.to_string(),
            modern_bird_families: owned(MODERN_BIRD_FAMILIES),
        }
    }
}

impl FilterRules {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::config(format!("Cannot read filter rules {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Why a candidate was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    Ichnogenus,
    IchnoSuffix,
    EggFossil,
    ModernBird,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ichnogenus => "ichnogenus",
            Self::IchnoSuffix => "ichno_suffix",
            Self::EggFossil => "egg_fossil",
            Self::ModernBird => "modern_bird",
        };
        f.write_str(s)
    }
}

/// Exclusion counts by reason
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub ichnogenus: usize,
    pub ichno_suffix: usize,
    pub egg_fossil: usize,
    pub modern_bird: usize,
}

impl FilterStats {
    fn record(&mut self, reason: ExclusionReason) {
        match reason {
            ExclusionReason::Ichnogenus => self.ichnogenus += 1,
            ExclusionReason::IchnoSuffix => self.ichno_suffix += 1,
            ExclusionReason::EggFossil => self.egg_fossil += 1,
            ExclusionReason::ModernBird => self.modern_bird += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ichnogenus + self.ichno_suffix + self.egg_fossil + self.modern_bird
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Survivors, in input order
    pub kept: Vec<CandidateSpecies>,
    pub excluded: Vec<(CandidateSpecies, ExclusionReason)>,
    pub stats: FilterStats,
}

/// Compiled form of `FilterRules`; pure and deterministic
#[derive(Debug, Clone)]
pub struct SpeciesFilter {
    ichnogenera: HashSet<String>,
    suffixes: Vec<String>,
    egg_marker: String,
    bird_families: HashSet<String>,
}

impl SpeciesFilter {
    pub fn new(rules: &FilterRules) -> Self {
        Self {
            ichnogenera: rules.ichnogenera.iter().cloned().collect(),
            suffixes: rules.ichno_suffixes.iter().map(|s| s.to_lowercase()).collect(),
            egg_marker: rules.egg_marker.to_lowercase(),
            bird_families: rules.modern_bird_families.iter().cloned().collect(),
        }
    }

    /// First matching rule, checked in the order genus, suffix, egg, bird
    pub fn exclusion_reason(&self, candidate: &CandidateSpecies) -> Option<ExclusionReason> {
        if self.ichnogenera.contains(candidate.genus()) {
            return Some(ExclusionReason::Ichnogenus);
        }

        let name = candidate.name.to_lowercase();
        if self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())) {
            return Some(ExclusionReason::IchnoSuffix);
        }

        if !self.egg_marker.is_empty()
            && (name.contains(&self.egg_marker)
                || candidate.parent.to_lowercase().contains(&self.egg_marker))
        {
            return Some(ExclusionReason::EggFossil);
        }

        if candidate
            .family
            .as_deref()
            .is_some_and(|family| self.bird_families.contains(family))
        {
            return Some(ExclusionReason::ModernBird);
        }

        None
    }

    pub fn is_filtered(&self, candidate: &CandidateSpecies) -> bool {
        self.exclusion_reason(candidate).is_some()
    }

    pub fn apply(&self, candidates: Vec<CandidateSpecies>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for candidate in candidates {
            match self.exclusion_reason(&candidate) {
                Some(reason) => {
                    debug!(species = %candidate.name, %reason, "Excluding candidate");
                    outcome.stats.record(reason);
                    outcome.excluded.push((candidate, reason));
                }
                None => outcome.kept.push(candidate),
            }
        }

        outcome
    }
}

impl Default for SpeciesFilter {
    fn default() -> Self {
        Self::new(&FilterRules::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn candidate(name: &str, parent: &str, family: Option<&str>) -> CandidateSpecies {
        CandidateSpecies {
            name: name.to_string(),
            rank: "species".to_string(),
            parent: parent.to_string(),
            group: "Theropoda".to_string(),
            family: family.map(String::from),
            max_ma: None,
            min_ma: None,
        }
    }

    #[test]
    fn test_ichnogenus_excluded() {
        let filter = SpeciesFilter::default();
        let c = candidate("Grallator sp.", "Grallator", None);
        assert_eq!(filter.exclusion_reason(&c), Some(ExclusionReason::Ichnogenus));
    }

    #[test]
    fn test_suffix_is_case_insensitive() {
        let filter = SpeciesFilter::default();
        let c = candidate("Novum IGUANODONTIPES", "Novum", None);
        assert_eq!(filter.exclusion_reason(&c), Some(ExclusionReason::IchnoSuffix));
        assert!(filter.is_filtered(&candidate("Fooichnus barichnus", "Fooichnus", None)));
    }

    #[test]
    fn test_egg_marker_on_name_or_parent() {
        let filter = SpeciesFilter::default();
        assert!(filter.is_filtered(&candidate("Archaeopteryx oolithus-form", "Archaeopteryx", None)));
        assert_eq!(
            filter.exclusion_reason(&candidate("Foo bar", "Spheroolithus", None)),
            Some(ExclusionReason::EggFossil)
        );
    }

    #[test]
    fn test_modern_bird_family() {
        let filter = SpeciesFilter::default();
        let c = candidate("Corvus corax", "Corvus", Some("Corvidae"));
        assert_eq!(filter.exclusion_reason(&c), Some(ExclusionReason::ModernBird));
        assert!(!filter.is_filtered(&candidate(
            "Tyrannosaurus rex",
            "Tyrannosaurus",
            Some("Tyrannosauridae")
        )));
    }

    #[test]
    fn test_apply_preserves_order_and_counts() {
        let filter = SpeciesFilter::default();
        let outcome = filter.apply(vec![
            candidate("Velociraptor mongoliensis", "Velociraptor", Some("Dromaeosauridae")),
            candidate("Eubrontes giganteus", "Eubrontes", None),
            candidate("Allosaurus fragilis", "Allosaurus", Some("Allosauridae")),
            candidate("Pica pica", "Pica", Some("Corvidae")),
        ]);

        let kept: Vec<_> = outcome.kept.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(kept, vec!["Velociraptor mongoliensis", "Allosaurus fragilis"]);
        assert_eq!(outcome.stats.ichnogenus, 1);
        assert_eq!(outcome.stats.modern_bird, 1);
        assert_eq!(outcome.stats.total(), 2);
    }

    #[test]
    fn test_rules_from_toml() {
        let rules = FilterRules::from_toml_str(
            r#"
            version = 7
            ichnogenera = ["Tyrannosaurus"]
            ichno_suffixes = []
            "#,
        )
        .unwrap();
        assert_eq!(rules.version, 7);
        assert_eq!(rules.egg_marker, "oolithus");

        let filter = SpeciesFilter::new(&rules);
        assert!(filter.is_filtered(&candidate("Tyrannosaurus rex", "Tyrannosaurus", None)));
        assert!(!filter.is_filtered(&candidate("Grallator sp.", "Grallator", None)));
    }

    #[test]
    fn test_default_lists_have_no_duplicates() {
        let rules = FilterRules::default();
        let genera: HashSet<_> = rules.ichnogenera.iter().collect();
        assert_eq!(genera.len(), rules.ichnogenera.len());
        let families: HashSet<_> = rules.modern_bird_families.iter().collect();
        assert_eq!(families.len(), rules.modern_bird_families.len());
    }
}

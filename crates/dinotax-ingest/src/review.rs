//! Review report over the accepted species list
//!
//! Sanity checks for a fetch: how many species each group contributed, which
//! genera dominate, whether anything that is not a species slipped through, and
//! which well-known genera made it in.

use crate::models::CandidateSpecies;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

/// Genera a complete dinosaur dataset is expected to contain
pub const WELL_KNOWN_GENERA: &[&str] = &[
    "Tyrannosaurus",
    "Velociraptor",
    "Triceratops",
    "Stegosaurus",
    "Brachiosaurus",
    "Diplodocus",
    "Allosaurus",
    "Spinosaurus",
    "Ankylosaurus",
    "Parasaurolophus",
    "Iguanodon",
    "Brontosaurus",
    "Carnotaurus",
    "Dilophosaurus",
    "Gallimimus",
    "Compsognathus",
    "Pachycephalosaurus",
    "Deinonychus",
    "Archaeopteryx",
    "Giganotosaurus",
    "Therizinosaurus",
    "Utahraptor",
    "Protoceratops",
    "Styracosaurus",
    "Microraptor",
    "Argentinosaurus",
    "Oviraptor",
    "Edmontosaurus",
    "Maiasaura",
    "Coelophysis",
    "Plateosaurus",
    "Psittacosaurus",
    "Dreadnoughtus",
    "Carcharodontosaurus",
    "Kentrosaurus",
    "Corythosaurus",
    "Acrocanthosaurus",
    "Yutyrannus",
    "Sinosauropteryx",
    "Deinocheirus",
    "Pachyrhinosaurus",
    "Amargasaurus",
    "Herrerasaurus",
    "Chasmosaurus",
    "Ceratosaurus",
    "Mamenchisaurus",
    "Megalosaurus",
    "Sauroposeidon",
    "Albertosaurus",
    "Dracorex",
    "Irritator",
    "Lambeosaurus",
    "Ouranosaurus",
    "Torosaurus",
    "Zuniceratops",
    "Apatosaurus",
    "Baryonyx",
    "Centrosaurus",
    "Daspletosaurus",
    "Lesothosaurus",
    "Neovenator",
    "Ornithomimus",
    "Pentaceratops",
    "Camarasaurus",
    "Giraffatitan",
    "Hypsilophodon",
];

/// Number of genera listed in `top_genera`
pub const TOP_GENERA: usize = 20;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewReport {
    pub total: usize,
    pub per_group: BTreeMap<String, usize>,
    /// Genera with the most species, highest count first
    pub top_genera: Vec<(String, usize)>,
    /// (name, rank) of records whose rank label is not "species"
    pub non_species: Vec<(String, String)>,
    /// Well-known genus -> species found for it
    pub well_known_present: BTreeMap<String, Vec<String>>,
    pub well_known_missing: Vec<String>,
}

impl ReviewReport {
    pub fn build<'a>(species: impl IntoIterator<Item = &'a CandidateSpecies>) -> Self {
        let mut report = Self::default();
        let mut by_genus: HashMap<&str, Vec<String>> = HashMap::new();

        for s in species {
            report.total += 1;
            *report.per_group.entry(s.group.clone()).or_default() += 1;
            by_genus.entry(s.genus()).or_default().push(s.name.clone());

            if s.rank != "species" {
                report.non_species.push((s.name.clone(), s.rank.clone()));
            }
        }

        let mut top: Vec<(String, usize)> = by_genus
            .iter()
            .map(|(genus, names)| (genus.to_string(), names.len()))
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(TOP_GENERA);
        report.top_genera = top;

        for genus in WELL_KNOWN_GENERA {
            match by_genus.get(genus) {
                Some(names) => {
                    report.well_known_present.insert(genus.to_string(), names.clone());
                }
                None => report.well_known_missing.push(genus.to_string()),
            }
        }

        report
    }

    /// Plain-text rendering for the terminal
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Total species: {}", self.total);

        let _ = writeln!(out, "\nSpecies per group:");
        for (group, count) in &self.per_group {
            let _ = writeln!(out, "  {}: {}", group, count);
        }

        let _ = writeln!(out, "\nTop genera by species count:");
        for (genus, count) in &self.top_genera {
            let _ = writeln!(out, "  {}: {}", genus, count);
        }

        if self.non_species.is_empty() {
            let _ = writeln!(out, "\nAll records are of species rank.");
        } else {
            let _ = writeln!(out, "\nWarning: found non-species ranks:");
            for (name, rank) in &self.non_species {
                let _ = writeln!(out, "  {} ({})", name, rank);
            }
        }

        let _ = writeln!(
            out,
            "\nWell-known genera present: {}/{}",
            self.well_known_present.len(),
            WELL_KNOWN_GENERA.len()
        );
        for genus in &self.well_known_missing {
            let _ = writeln!(out, "  missing: {}", genus);
        }

        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn species(name: &str, group: &str, rank: &str) -> CandidateSpecies {
        CandidateSpecies {
            name: name.to_string(),
            rank: rank.to_string(),
            parent: name.split(' ').next().unwrap().to_string(),
            group: group.to_string(),
            family: None,
            max_ma: None,
            min_ma: None,
        }
    }

    #[test]
    fn test_report_counts() {
        let list = vec![
            species("Tyrannosaurus rex", "Theropoda", "species"),
            species("Allosaurus fragilis", "Theropoda", "species"),
            species("Allosaurus jimmadseni", "Saurischia", "species"),
            species("Oddity", "Saurischia", "genus"),
        ];
        let report = ReviewReport::build(&list);

        assert_eq!(report.total, 4);
        assert_eq!(report.per_group["Theropoda"], 2);
        assert_eq!(report.top_genera[0], ("Allosaurus".to_string(), 2));
        assert_eq!(report.non_species, vec![("Oddity".to_string(), "genus".to_string())]);
        assert_eq!(report.well_known_present["Allosaurus"].len(), 2);
        assert!(report.well_known_missing.contains(&"Triceratops".to_string()));
        assert!(!report.well_known_missing.contains(&"Tyrannosaurus".to_string()));
        assert!(report.render().contains("Well-known genera present: 2/"));
    }

    #[test]
    fn test_top_genera_use_genus_token_not_parent() {
        let mut a = species("Tyrannosaurus rex", "Theropoda", "species");
        a.parent = "Tyrannosaurinae".to_string();
        let mut b = species("Tyrannosaurus bataar", "Theropoda", "species");
        b.parent = "Tarbosaurus".to_string();

        let report = ReviewReport::build([&a, &b]);
        assert_eq!(report.top_genera, vec![("Tyrannosaurus".to_string(), 2)]);
    }
}

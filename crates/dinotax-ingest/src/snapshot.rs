//! Snapshot writer
//!
//! Persists a run as canonical JSON files plus a manifest of SHA-256 checksums.
//! Output is sorted throughout, so an unchanged upstream yields byte-identical
//! files and identical checksums.

use crate::error::{IngestError, Result};
use crate::pipeline::{IngestOutcome, RunStats};
use crate::tree::ConflictPolicy;
use dinotax_common::checksum::{sha256_hex, verify_file_checksum};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TAXA_FILE: &str = "taxa.json";
pub const SPECIES_FILE: &str = "species.json";
pub const TREE_FILE: &str = "tree.json";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub taxa: usize,
    pub species: usize,
    pub tree_nodes: usize,
    pub conflicts: usize,
    pub failed_units: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub conflict_policy: ConflictPolicy,
    pub files: BTreeMap<String, FileEntry>,
    pub stats: SnapshotStats,
}

impl SnapshotManifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check every listed file in `dir` against its recorded checksum
    pub fn verify(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        for (name, entry) in &self.files {
            verify_file_checksum(dir.join(name), &entry.sha256)?;
        }
        Ok(())
    }
}

pub struct SnapshotWriter {
    output_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
        files: &mut BTreeMap<String, FileEntry>,
    ) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');

        let path = self.output_dir.join(name);
        std::fs::write(&path, &bytes).map_err(|e| {
            IngestError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write {}: {}", path.display(), e),
            ))
        })?;

        files.insert(
            name.to_string(),
            FileEntry {
                sha256: sha256_hex(&bytes),
                bytes: bytes.len() as u64,
            },
        );
        Ok(())
    }

    /// Write taxa, species, tree and manifest; returns the manifest
    pub fn write(&self, outcome: &IngestOutcome) -> Result<SnapshotManifest> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut files = BTreeMap::new();
        self.write_json(TAXA_FILE, &outcome.taxa, &mut files)?;
        self.write_json(SPECIES_FILE, &outcome.species, &mut files)?;
        self.write_json(TREE_FILE, &outcome.tree.to_nested(), &mut files)?;

        let manifest = SnapshotManifest {
            conflict_policy: outcome.tree.policy(),
            files,
            stats: snapshot_stats(outcome),
        };

        let mut bytes = serde_json::to_vec_pretty(&manifest)?;
        bytes.push(b'\n');
        std::fs::write(self.output_dir.join(MANIFEST_FILE), bytes)?;

        info!(
            dir = %self.output_dir.display(),
            taxa = manifest.stats.taxa,
            species = manifest.stats.species,
            "Snapshot written"
        );

        Ok(manifest)
    }
}

fn snapshot_stats(outcome: &IngestOutcome) -> SnapshotStats {
    let RunStats { taxa, conflicts, .. } = outcome.stats;
    SnapshotStats {
        taxa,
        species: outcome.species.len(),
        tree_nodes: outcome.tree.len(),
        conflicts,
        failed_units: outcome.failures.len(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{Lineage, TaxonId, TaxonRecord};
    use crate::tree::{build_tree, TreeOptions};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn outcome() -> IngestOutcome {
        let info: HashMap<TaxonId, TaxonRecord> = [
            TaxonRecord::new("1", "Dinosauria", 25, None),
            TaxonRecord::new("2", "Stegosaurus stenops", 3, Some("1".into())),
        ]
        .into_iter()
        .map(|r| (r.id.clone(), r))
        .collect();
        let lineage = Lineage::new(vec!["1".into(), "2".into()]).unwrap();
        let build = build_tree(
            &[lineage],
            &info,
            &TreeOptions::new("Dinosauria", ConflictPolicy::Strict),
        )
        .unwrap();
        let taxa = build.tree.to_records();

        IngestOutcome {
            stats: RunStats {
                taxa: taxa.len(),
                ..Default::default()
            },
            tree: build.tree,
            taxa,
            species: Vec::new(),
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_write_and_verify() {
        let dir = TempDir::new().unwrap();
        let manifest = SnapshotWriter::new(dir.path()).write(&outcome()).unwrap();

        assert_eq!(manifest.files.len(), 3);
        assert_eq!(manifest.stats.taxa, 2);
        assert!(dir.path().join(MANIFEST_FILE).exists());

        let loaded = SnapshotManifest::from_file(dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(loaded, manifest);
        loaded.verify(dir.path()).unwrap();
    }

    #[test]
    fn test_verify_detects_tampering() {
        let dir = TempDir::new().unwrap();
        let manifest = SnapshotWriter::new(dir.path()).write(&outcome()).unwrap();

        std::fs::write(dir.path().join(TREE_FILE), b"{}").unwrap();
        let err = manifest.verify(dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::Common(_)));
    }
}

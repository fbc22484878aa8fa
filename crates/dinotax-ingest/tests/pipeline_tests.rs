//! End-to-end pipeline tests against an in-memory taxon source
//!
//! These tests validate:
//! - Screening of a raw group fetch
//! - Failure isolation for groups and species
//! - Tree shape and species records
//! - Byte-identical snapshots across runs

use dinotax_ingest::config::IngestConfig;
use dinotax_ingest::error::IngestError;
use dinotax_ingest::measurements::{MeasurementEntry, MeasurementTable};
use dinotax_ingest::models::{CandidateSpecies, TaxonId, TaxonRecord};
use dinotax_ingest::pipeline::IngestionPipeline;
use dinotax_ingest::snapshot::{SnapshotManifest, SnapshotWriter, MANIFEST_FILE};
use dinotax_ingest::source::StaticSource;
use dinotax_ingest::tree::{ConflictPolicy, NodeKind};
use std::sync::Arc;
use tempfile::TempDir;

fn candidate(name: &str, group: &str, family: Option<&str>) -> CandidateSpecies {
    CandidateSpecies {
        name: name.to_string(),
        rank: "species".to_string(),
        parent: name.split(' ').next().unwrap().to_string(),
        group: group.to_string(),
        family: family.map(String::from),
        max_ma: Some(150.0),
        min_ma: Some(145.0),
    }
}

/// Dinosauria -> {Theropoda -> {Tyrannosaurus, Allosaurus}, Ornithischia -> Stegosaurus}
fn taxa() -> Vec<TaxonRecord> {
    vec![
        TaxonRecord::new("1", "Dinosauria", 25, None),
        TaxonRecord::new("10", "Theropoda", 25, Some("1".into())),
        TaxonRecord::new("20", "Ornithischia", 13, Some("1".into())),
        TaxonRecord::new("100", "Tyrannosaurus", 5, Some("10".into())),
        TaxonRecord::new("101", "Allosaurus", 5, Some("10".into())),
        TaxonRecord::new("200", "Stegosaurus", 5, Some("20".into())),
        TaxonRecord::new("1000", "Tyrannosaurus rex", 3, Some("100".into())),
        TaxonRecord::new("1010", "Allosaurus fragilis", 3, Some("101".into())),
        TaxonRecord::new("2000", "Stegosaurus stenops", 3, Some("200".into())),
    ]
}

fn source() -> StaticSource {
    StaticSource::new()
        .with_taxa(taxa())
        .with_group(
            "Theropoda",
            vec![
                candidate("Tyrannosaurus rex", "Theropoda", Some("Tyrannosauridae")),
                candidate("Allosaurus fragilis", "Theropoda", Some("Allosauridae")),
                candidate("Eubrontes giganteus", "Theropoda", None),
            ],
        )
        .with_group(
            "Saurischia",
            vec![candidate("Tyrannosaurus rex", "Saurischia", Some("Tyrannosauridae"))],
        )
        .with_group(
            "Ornithischia",
            vec![candidate("Stegosaurus stenops", "Ornithischia", Some("Stegosauridae"))],
        )
}

fn config() -> IngestConfig {
    IngestConfig::default().with_groups(["Theropoda", "Saurischia", "Ornithischia"])
}

#[tokio::test]
async fn test_theropoda_fetch_keeps_one_record() {
    let source = StaticSource::new().with_group(
        "Theropoda",
        vec![
            candidate("Grallator sp.", "Theropoda", None),
            candidate("Archaeopteryx oolithus-form", "Theropoda", None),
            candidate("Velociraptor mongoliensis", "Theropoda", Some("Dromaeosauridae")),
        ],
    );
    let pipeline =
        IngestionPipeline::new(config().with_groups(["Theropoda"]), Arc::new(source)).unwrap();

    let selection = pipeline.collect_species().await.unwrap();

    assert_eq!(selection.candidates, 3);
    assert_eq!(selection.accepted.len(), 1);
    assert_eq!(selection.accepted[0].name, "Velociraptor mongoliensis");
    assert_eq!(selection.excluded.ichnogenus, 1);
    assert_eq!(selection.excluded.egg_fossil, 1);
}

#[tokio::test]
async fn test_full_run_builds_tree() {
    let pipeline = IngestionPipeline::new(config(), Arc::new(source())).unwrap();
    let outcome = pipeline.run().await.unwrap();

    assert!(outcome.stats.is_success(), "{}", outcome.stats.summary());
    assert_eq!(outcome.stats.candidates, 5);
    assert_eq!(outcome.stats.excluded, 1);
    assert_eq!(outcome.stats.duplicates, 1);
    assert_eq!(outcome.stats.processed, 3);
    assert_eq!(outcome.stats.succeeded, 3);

    let tree = &outcome.tree;
    assert_eq!(tree.root().name, "Dinosauria");
    assert_eq!(tree.species_count(), 3);
    assert_eq!(tree.children(&TaxonId::from("10")).len(), 2);
    assert_eq!(
        tree.path_to(&TaxonId::from("1000")).unwrap(),
        vec![
            TaxonId::from("1"),
            TaxonId::from("10"),
            TaxonId::from("100"),
            TaxonId::from("1000")
        ]
    );
    assert_eq!(tree.get(&TaxonId::from("1000")).unwrap().kind, NodeKind::Species);

    // Alphabetical, first-fetched group retained for the duplicate
    let names: Vec<_> = outcome.species.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Allosaurus fragilis", "Stegosaurus stenops", "Tyrannosaurus rex"]);
    let rex = &outcome.species[2];
    assert_eq!(rex.group, "Theropoda");
    assert_eq!(rex.description, "Order: Theropoda, Family: Tyrannosauridae");
    assert_eq!(rex.time_range, "150 - 145 Ma");

    assert_eq!(outcome.taxa.len(), 9);
}

#[tokio::test]
async fn test_failed_group_does_not_abort_run() {
    let source = source().with_failing_group("Ornithischia");
    let pipeline = IngestionPipeline::new(config(), Arc::new(source)).unwrap();
    let outcome = pipeline.run().await.unwrap();

    assert_eq!(outcome.stats.groups_failed, 1);
    assert_eq!(outcome.stats.succeeded, 2);
    assert!(!outcome.stats.is_success());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].unit, "group Ornithischia");
    assert_eq!(outcome.failures[0].kind, "source_unavailable");
}

#[tokio::test]
async fn test_failed_species_lookup_is_isolated() {
    let source = source().with_failing_taxon("1010");
    let pipeline = IngestionPipeline::new(config(), Arc::new(source)).unwrap();
    let outcome = pipeline.run().await.unwrap();

    assert_eq!(outcome.stats.processed, 3);
    assert_eq!(outcome.stats.succeeded, 2);
    assert_eq!(outcome.stats.failed, 1);
    assert!(outcome.tree.get(&TaxonId::from("1010")).is_none());
}

#[tokio::test]
async fn test_detached_partial_lineage_is_reported() {
    // Allosaurus' parent lookup fails, so its chain never reaches the root
    let source = source().with_failing_taxon("101");
    let pipeline = IngestionPipeline::new(config(), Arc::new(source)).unwrap();
    let outcome = pipeline.run().await.unwrap();

    assert_eq!(outcome.stats.succeeded, 2);
    assert!(outcome
        .failures
        .iter()
        .any(|f| f.kind == "detached_lineage" && f.unit == "taxon 1010"));
}

#[tokio::test]
async fn test_missing_root_is_fatal() {
    let source = StaticSource::new()
        .with_taxa([
            TaxonRecord::new("100", "Tyrannosaurus", 5, None),
            TaxonRecord::new("1000", "Tyrannosaurus rex", 3, Some("100".into())),
        ])
        .with_group(
            "Theropoda",
            vec![candidate("Tyrannosaurus rex", "Theropoda", None)],
        );
    let pipeline =
        IngestionPipeline::new(config().with_groups(["Theropoda"]), Arc::new(source)).unwrap();

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, IngestError::RootNotFound(_)));
}

#[tokio::test]
async fn test_synonym_resolving_to_recorded_taxon_is_listed_as_failure() {
    let source = source()
        .with_synonym("Tyrannosaurus bataar", "1000")
        .with_group(
            "Saurischia",
            vec![candidate("Tyrannosaurus bataar", "Saurischia", Some("Tyrannosauridae"))],
        );
    let pipeline = IngestionPipeline::new(config(), Arc::new(source)).unwrap();
    let outcome = pipeline.run().await.unwrap();

    assert_eq!(outcome.stats.processed, 4);
    assert_eq!(outcome.stats.succeeded, 3);
    assert_eq!(outcome.stats.failed, 1);
    assert_eq!(outcome.failures.len(), outcome.stats.failed);
    assert_eq!(outcome.failures[0].unit, "species Tyrannosaurus rex");
    assert_eq!(outcome.failures[0].kind, "duplicate_taxon");

    let bataar = outcome.species.iter().find(|s| s.id.as_str() == "1000").unwrap();
    assert_eq!(bataar.name, "Tyrannosaurus bataar");
}

#[tokio::test]
async fn test_full_outage_reports_failures_instead_of_missing_root() {
    let source = source()
        .with_failing_group("Theropoda")
        .with_failing_group("Saurischia")
        .with_failing_group("Ornithischia");
    let pipeline = IngestionPipeline::new(config(), Arc::new(source)).unwrap();

    match pipeline.run().await.unwrap_err() {
        IngestError::NothingResolved {
            processed,
            failures,
        } => {
            assert_eq!(processed, 0);
            assert_eq!(failures.len(), 3);
            assert!(failures.iter().all(|f| f.kind == "source_unavailable"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_every_species_failing_is_not_a_missing_root() {
    let source = source()
        .with_failing_taxon("1000")
        .with_failing_taxon("1010")
        .with_failing_taxon("2000");
    let pipeline = IngestionPipeline::new(config(), Arc::new(source)).unwrap();

    let err = pipeline.run().await.unwrap_err();
    assert!(
        matches!(&err, IngestError::NothingResolved { processed: 3, failures } if failures.len() == 3),
        "{err}"
    );
}

#[tokio::test]
async fn test_species_limit_and_measurements() {
    let measurements = MeasurementTable::from_entries([MeasurementEntry {
        name: "Allosaurus fragilis".to_string(),
        length: Some("8.5 m".to_string()),
        weight: Some("N/A".to_string()),
    }]);
    let pipeline = IngestionPipeline::new(config().with_species_limit(1), Arc::new(source()))
        .unwrap()
        .with_measurements(measurements);

    let outcome = pipeline.run().await.unwrap();

    assert_eq!(outcome.species.len(), 1);
    assert_eq!(outcome.species[0].name, "Allosaurus fragilis");
    assert_eq!(outcome.species[0].length, Some(8.5));
    assert_eq!(outcome.species[0].weight, None);
}

#[tokio::test]
async fn test_consistent_source_merges_under_either_policy() {
    for policy in [ConflictPolicy::Strict, ConflictPolicy::Permissive] {
        let pipeline =
            IngestionPipeline::new(config().with_conflict_policy(policy), Arc::new(source()))
                .unwrap();
        let outcome = pipeline.run().await.unwrap();

        assert_eq!(outcome.tree.policy(), policy);
        assert_eq!(outcome.stats.succeeded, 3);
        assert!(outcome.tree.conflicts().is_empty());
        assert_eq!(outcome.tree.placements(&TaxonId::from("10")).len(), 1);
    }
}

#[tokio::test]
async fn test_snapshot_is_byte_identical_across_runs() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();

    for dir in [&first, &second] {
        let pipeline = IngestionPipeline::new(config(), Arc::new(source())).unwrap();
        let outcome = pipeline.run().await.unwrap();
        SnapshotWriter::new(dir.path()).write(&outcome).unwrap();
    }

    let a = SnapshotManifest::from_file(first.path().join(MANIFEST_FILE)).unwrap();
    let b = SnapshotManifest::from_file(second.path().join(MANIFEST_FILE)).unwrap();
    assert_eq!(a, b);
    a.verify(second.path()).unwrap();

    for file in a.files.keys() {
        let left = std::fs::read(first.path().join(file)).unwrap();
        let right = std::fs::read(second.path().join(file)).unwrap();
        assert_eq!(left, right, "{file} differs between runs");
    }
}

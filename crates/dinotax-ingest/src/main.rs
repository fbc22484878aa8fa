//! Dinotax Ingest - dinosaur taxonomy ingestion tool

use anyhow::{Context, Result};
use dinotax_common::logging::{init_logging, LogConfig, LogLevel};
use dinotax_ingest::config::IngestConfig;
use dinotax_ingest::error::IngestError;
use dinotax_ingest::pbdb::PbdbClient;
use dinotax_ingest::pipeline::IngestionPipeline;
use dinotax_ingest::review::ReviewReport;
use dinotax_ingest::snapshot::SnapshotWriter;
use dinotax_ingest::tree::ConflictPolicy;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(clap::Parser, Debug)]
#[command(name = "dinotax-ingest")]
#[command(author, version, about = "Dinosaur taxonomy ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "DINOTAX_CONFIG")]
    config: Option<PathBuf>,

    /// Override the conflict policy (strict, permissive)
    #[arg(long, global = true)]
    conflict_policy: Option<ConflictPolicy>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and write a snapshot
    Run {
        /// Output directory
        #[arg(short, long, default_value = "./data/dinotax")]
        output: PathBuf,

        /// Only resolve the first N species (alphabetical)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Fetch, filter and deduplicate species without resolving lineages
    Species {
        /// Write the accepted species list to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve and print the lineage of one species
    Lineage {
        /// Scientific name, e.g. "Tyrannosaurus rex"
        name: String,
    },

    /// Print a review report of the accepted species
    Review {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> Result<IngestConfig> {
    let config = match &cli.config {
        Some(path) => IngestConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => IngestConfig::default(),
    };

    let mut config = config
        .merge_env()
        .context("Invalid DINOTAX_* environment settings")?;
    if let Some(policy) = cli.conflict_policy {
        config.conflict_policy = policy;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    use clap::Parser;

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("dinotax-ingest")
        .filter_directives("hyper=warn,reqwest=warn")
        .build()
        .merge_env()
        .context("Invalid LOG_* environment settings")?;

    let _guard = init_logging(&log_config)?;

    let mut config = load_config(&cli)?;
    if let Command::Run {
        limit: Some(limit), ..
    } = &cli.command
    {
        config.species_limit = Some(*limit);
    }

    let source = Arc::new(PbdbClient::new(&config).context("Failed to build PBDB client")?);
    let pipeline = IngestionPipeline::new(config, source).context("Invalid configuration")?;

    match cli.command {
        Command::Run { output, .. } => {
            let outcome = pipeline
                .run()
                .await
                .inspect_err(|e| {
                    if let IngestError::NothingResolved { failures, .. } = e {
                        for failure in failures {
                            warn!(unit = %failure.unit, kind = %failure.kind, "{}", failure.message);
                        }
                    }
                })
                .context("Ingestion failed")?;
            let manifest = SnapshotWriter::new(&output)
                .write(&outcome)
                .with_context(|| format!("Failed to write snapshot to {}", output.display()))?;

            for failure in &outcome.failures {
                info!(unit = %failure.unit, kind = %failure.kind, "Skipped unit");
            }
            info!(
                files = manifest.files.len(),
                dir = %output.display(),
                "{}",
                outcome.stats.summary()
            );
        }
        Command::Species { output } => {
            let selection = pipeline.collect_species().await?;
            info!(
                accepted = selection.accepted.len(),
                candidates = selection.candidates,
                excluded = selection.excluded.total(),
                duplicates = selection.duplicates,
                groups_failed = selection.groups_failed,
                "Species selection complete"
            );

            match output {
                Some(path) => {
                    let json = serde_json::to_string_pretty(&selection.accepted)?;
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Species list written");
                }
                None => {
                    for species in &selection.accepted {
                        println!("{}\t{}", species.name, species.group);
                    }
                }
            }
        }
        Command::Lineage { name } => {
            let resolver = pipeline.resolver();
            let (record, lineage) = resolver
                .resolve_species(&name)
                .await
                .with_context(|| format!("Failed to resolve {}", name))?;

            info!(species = %name, taxon_id = %record.id, depth = lineage.len(), "Lineage resolved");
            for (depth, id) in lineage.ids().iter().enumerate() {
                let label = resolver
                    .cache()
                    .get(id)
                    .map(|r| r.name)
                    .unwrap_or_else(|| "Unknown".to_string());
                println!("{}{} ({})", "  ".repeat(depth), label, id);
            }
        }
        Command::Review { json } => {
            let selection = pipeline.collect_species().await?;
            let report = ReviewReport::build(selection.accepted.iter().map(|s| &**s));
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
        }
    }

    info!("Done");
    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use kamptrail_dedupe::ingestion::geojson;
use kamptrail_dedupe::observability::logging;
use kamptrail_dedupe::pipeline::audit::{audit_directory, AuditIssueKind};
use kamptrail_dedupe::pipeline::orchestrator::{
    run_partition, run_partitions, PartitionInput, PartitionSource,
};
use kamptrail_dedupe::DedupeConfig;

const ALL_STATES: &[&str] = &[
    "AK", "AL", "AR", "AZ", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "IA", "ID", "IL", "IN",
    "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MS", "MT", "NC", "ND", "NE", "NH",
    "NJ", "NM", "NV", "NY", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

#[derive(Parser)]
#[command(name = "kamptrail-dedupe")]
#[command(about = "Campsite data deduplication and merge pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Use the coarse regional-merge profile (500m radius, Levenshtein names)
    #[arg(long, global = true)]
    coarse: bool,
    /// Override the outer duplicate radius in meters
    #[arg(long, global = true)]
    radius_meters: Option<f64>,
    /// Override the name similarity threshold
    #[arg(long, global = true)]
    threshold: Option<f64>,
    /// Override the automatic-duplicate inner radius in meters
    #[arg(long, global = true)]
    inner_radius_meters: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge one or more GeoJSON collections into a deduplicated output
    Merge {
        /// Input GeoJSON files, in priority order
        #[arg(long, required = true)]
        input: Vec<PathBuf>,
        /// Source labels matched positionally to --input, used when features
        /// carry no source of their own
        #[arg(long)]
        source: Vec<String>,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
    /// Merge Recreation.gov and OpenStreetMap data per state
    MergeStates {
        /// Directory of per-state Recreation.gov files (<ST>.geojson)
        #[arg(long, default_value = "data/campsites")]
        campsites_dir: PathBuf,
        /// Directory of per-state OpenStreetMap files (<ST>.geojson)
        #[arg(long, default_value = "data/opencampingmap")]
        osm_dir: PathBuf,
        /// Comma-separated state codes to process (default: all 50)
        #[arg(long)]
        states: Option<String>,
    },
    /// Concatenate previously merged partition outputs into one collection
    Combine {
        /// Directory containing <ST>_merged.geojson files
        #[arg(long, default_value = "data/campsites")]
        dir: PathBuf,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
    /// Audit a data directory for empty, invalid, or placeholder files
    Audit {
        #[arg(long, default_value = "data")]
        dir: PathBuf,
    },
}

fn resolve_config(cli: &Cli) -> anyhow::Result<DedupeConfig> {
    let mut config = match &cli.config {
        Some(path) => DedupeConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        // merge-states combines whole regional datasets, which is what the
        // coarse profile exists for
        None if cli.coarse || matches!(cli.command, Commands::MergeStates { .. }) => {
            DedupeConfig::coarse()
        }
        None => DedupeConfig::fine(),
    };

    if let Some(radius) = cli.radius_meters {
        config.radius_meters = radius;
    }
    if let Some(threshold) = cli.threshold {
        config.name_similarity_threshold = threshold;
    }
    if let Some(inner) = cli.inner_radius_meters {
        config.inner_radius_meters = inner;
    }

    // configuration problems are a caller bug: abort before touching data
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Merge { input, source, out } => {
            let inputs = input
                .iter()
                .enumerate()
                .map(|(i, path)| PartitionSource {
                    path: path.clone(),
                    source_label: source.get(i).cloned(),
                })
                .collect();
            let partition = PartitionInput {
                id: out
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("merge")
                    .to_string(),
                inputs,
                output: out.clone(),
            };

            println!("🔄 Merging {} input collections...", input.len());
            let outcome = run_partition(&partition, &config)?;
            let summary = &outcome.summary;

            println!("\n📊 Merge results:");
            println!("   Input records:      {}", summary.input_records);
            println!("   Rejected:           {}", summary.rejected_total());
            for (reason, count) in &summary.rejected {
                println!("     - {reason}: {count}");
            }
            println!("   Unique records:     {}", summary.unique_records);
            println!("   Duplicates merged:  {}", summary.duplicates_merged);
            println!("   With ratings:       {}", summary.stats.rated);
            println!("   With reviews:       {}", summary.stats.reviewed);
            println!("   Free sites:         {}", summary.stats.free);
            println!("   Paid sites:         {}", summary.stats.paid);
            println!("\n   Data sources:");
            for (source, count) in &summary.stats.per_source {
                println!("     {source}: {count}");
            }
            println!("\n✅ Merged data saved to: {}", outcome.output.display());
        }
        Commands::MergeStates {
            campsites_dir,
            osm_dir,
            states,
        } => {
            let states: Vec<String> = match states {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => ALL_STATES.iter().map(|s| s.to_string()).collect(),
            };

            let partitions: Vec<PartitionInput> = states
                .iter()
                .map(|state| PartitionInput {
                    id: state.clone(),
                    inputs: vec![
                        PartitionSource {
                            path: campsites_dir.join(format!("{state}.geojson")),
                            source_label: Some("recreation.gov".to_string()),
                        },
                        PartitionSource {
                            path: osm_dir.join(format!("{state}.geojson")),
                            source_label: Some("opencampingmap".to_string()),
                        },
                    ],
                    output: campsites_dir.join(format!("{state}_merged.geojson")),
                })
                .collect();

            println!("🔄 Merging campsite data for {} states...", partitions.len());
            let report = run_partitions(partitions, &config).await?;

            let mut total_before = 0;
            let mut total_after = 0;
            let mut total_duplicates = 0;
            for outcome in &report.outcomes {
                let summary = &outcome.summary;
                total_before += summary.input_records;
                total_after += summary.unique_records;
                total_duplicates += summary.duplicates_merged;
                println!(
                    "  [{}] {} → {} sites ({} duplicates removed, {} rejected)",
                    outcome.partition,
                    summary.input_records,
                    summary.unique_records,
                    summary.duplicates_merged,
                    summary.rejected_total(),
                );
            }

            println!("\n📊 Summary:");
            println!("   States processed:   {}", report.outcomes.len());
            println!("   Total before:       {total_before}");
            println!("   Total after:        {total_after}");
            println!("   Duplicates removed: {total_duplicates}");

            if !report.failed.is_empty() {
                println!("\n⚠️  Failed partitions:");
                for failure in &report.failed {
                    println!("   - {}: {}", failure.partition, failure.message);
                }
            } else {
                println!("\n✅ All states merged successfully!");
            }
        }
        Commands::Combine { dir, out } => {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .map_or(false, |n| n.ends_with("_merged.geojson"))
                })
                .collect();
            paths.sort();

            let mut features = Vec::new();
            for path in &paths {
                let collection = geojson::load_collection(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                info!(path = %path.display(), features = collection.features.len(), "combining");
                features.extend(collection.features);
            }

            let combined = kamptrail_dedupe::FeatureCollection::new(features);
            geojson::save_collection(&out, &combined)?;
            println!(
                "✅ Combined {} files ({} features) into {}",
                paths.len(),
                combined.features.len(),
                out.display()
            );
        }
        Commands::Audit { dir } => {
            let report = audit_directory(&dir, &config)?;
            println!("📋 Audited {} files", report.files_checked);
            for issue in &report.issues {
                let kind = match issue.kind {
                    AuditIssueKind::Unreadable => "UNREADABLE",
                    AuditIssueKind::Empty => "EMPTY",
                    AuditIssueKind::PlaceholderData => "PLACEHOLDER",
                };
                println!("   {} {}: {}", kind, issue.file.display(), issue.detail);
            }
            if report.is_clean() {
                println!("✅ No issues found - data is clean!");
            } else {
                println!("⚠️  {} issues found", report.issues.len());
            }
        }
    }

    Ok(())
}

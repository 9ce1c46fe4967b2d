//! Pipeline orchestration.
//!
//! `clean_and_merge` is the single pure entry point: it takes raw feature
//! collections and produces one deduplicated collection plus a summary. The
//! partition runner wraps it with file I/O and fans independent partitions
//! out across blocking worker threads; partitions share no mutable state, so
//! a failure in one never stops the others.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::common::error::{DedupeError, Result};
use crate::domain::{AttrValue, MergedRecord, PointRecord};
use crate::ingestion::geojson::{self, FeatureCollection, SourceCollection};
use crate::observability::metrics;
use crate::pipeline::cluster::cluster_records;
use crate::pipeline::config::DedupeConfig;
use crate::pipeline::conflation::merge_cluster;
use crate::pipeline::normalize::normalize_feature;
use crate::pipeline::quality_gate::QualityGate;

/// Result of one `clean_and_merge` run.
#[derive(Debug)]
pub struct DedupeOutcome {
    pub collection: FeatureCollection,
    pub summary: DedupeSummary,
}

/// Counts describing what one run did.
#[derive(Debug, Clone, Default)]
pub struct DedupeSummary {
    /// Raw features across all input collections.
    pub input_records: usize,
    /// Rejection counts by reason.
    pub rejected: BTreeMap<&'static str, usize>,
    /// Records that survived normalization and the quality gate.
    pub kept_records: usize,
    /// Unique records emitted.
    pub unique_records: usize,
    /// Records absorbed into another record.
    pub duplicates_merged: usize,
    pub stats: CollectionStats,
}

impl DedupeSummary {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Attribute statistics over the emitted collection, the same numbers the
/// merge reports have always printed.
#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    pub rated: usize,
    pub reviewed: usize,
    pub free: usize,
    pub paid: usize,
    pub per_source: BTreeMap<String, usize>,
}

/// Clean, cluster, and merge the given collections into one deduplicated
/// collection. Features are processed in collection order, then feature
/// order; that ordering is the reproducibility contract for the greedy
/// clustering pass.
pub fn clean_and_merge(
    collections: &[SourceCollection],
    config: &DedupeConfig,
) -> Result<DedupeOutcome> {
    config.validate()?;

    let gate = QualityGate::new(config);
    let mut summary = DedupeSummary::default();
    let mut records: Vec<PointRecord> = Vec::new();
    let mut position = 0usize;

    for source in collections {
        let fallback = source.source_fallback.as_deref();
        for feature in &source.collection.features {
            summary.input_records += 1;
            position += 1;

            let record = match normalize_feature(feature, position, fallback) {
                Ok(record) => {
                    metrics::normalize::record_accepted();
                    record
                }
                Err(reason) => {
                    debug!(%reason, "dropping malformed record");
                    metrics::normalize::record_rejected(reason.as_str());
                    *summary.rejected.entry(reason.as_str()).or_insert(0) += 1;
                    continue;
                }
            };

            match gate.assess(&record) {
                Ok(()) => {
                    metrics::quality_gate::record_accepted();
                    records.push(record);
                }
                Err(reason) => {
                    debug!(name = %record.name, %reason, "dropping placeholder record");
                    metrics::quality_gate::record_rejected(reason.as_str());
                    *summary.rejected.entry(reason.as_str()).or_insert(0) += 1;
                }
            }
        }
    }

    summary.kept_records = records.len();

    let merged: Vec<MergedRecord> = if config.keep_best {
        cluster_records(records, config)
            .into_iter()
            .map(|cluster| merge_cluster(cluster, config))
            .collect()
    } else {
        // concatenation mode: every cleaned record passes through
        records
            .into_iter()
            .map(|record| {
                let source = record.source.trim().to_string();
                MergedRecord {
                    record,
                    sources: vec![source],
                    group_size: 1,
                    merged_at: Utc::now(),
                }
            })
            .collect()
    };

    summary.unique_records = merged.len();
    summary.duplicates_merged = summary.kept_records - summary.unique_records;
    summary.stats = collect_stats(&merged);

    info!(
        input = summary.input_records,
        rejected = summary.rejected_total(),
        unique = summary.unique_records,
        duplicates = summary.duplicates_merged,
        "dedupe run complete"
    );

    Ok(DedupeOutcome {
        collection: geojson::collection_from_merged(&merged),
        summary,
    })
}

fn collect_stats(merged: &[MergedRecord]) -> CollectionStats {
    let mut stats = CollectionStats::default();
    for entry in merged {
        if entry.record.has_value("rating") {
            stats.rated += 1;
        }
        if entry.record.has_value("reviews") {
            stats.reviewed += 1;
        }
        match entry.record.attr("cost") {
            Some(AttrValue::Number(cost)) if *cost > 0.0 => stats.paid += 1,
            Some(AttrValue::Number(_)) => stats.free += 1,
            _ => {}
        }
        for source in &entry.sources {
            *stats.per_source.entry(source.clone()).or_insert(0) += 1;
        }
    }
    stats
}

/// One input file of a partition, with the source label to assume when the
/// features carry none.
#[derive(Debug, Clone)]
pub struct PartitionSource {
    pub path: PathBuf,
    pub source_label: Option<String>,
}

/// An independent batch: its identifier, input files, and output path.
#[derive(Debug, Clone)]
pub struct PartitionInput {
    pub id: String,
    pub inputs: Vec<PartitionSource>,
    pub output: PathBuf,
}

/// What happened to one partition.
#[derive(Debug)]
pub struct PartitionOutcome {
    pub partition: String,
    pub summary: DedupeSummary,
    pub output: PathBuf,
}

/// A failed partition, reported upward without stopping the run.
#[derive(Debug)]
pub struct PartitionFailure {
    pub partition: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct MergeReport {
    pub outcomes: Vec<PartitionOutcome>,
    pub failed: Vec<PartitionFailure>,
}

/// Run one partition end to end: load its inputs, dedupe, write the merged
/// output. Missing input files are skipped (not every source covers every
/// region); unreadable or invalid ones fail the whole partition.
pub fn run_partition(partition: &PartitionInput, config: &DedupeConfig) -> Result<PartitionOutcome> {
    let mut collections = Vec::new();

    for input in &partition.inputs {
        if !input.path.exists() {
            debug!(partition = %partition.id, path = %input.path.display(), "input not present, skipping");
            continue;
        }
        let collection =
            geojson::load_collection(&input.path).map_err(|e| DedupeError::PartitionRead {
                partition: partition.id.clone(),
                message: format!("{}: {}", input.path.display(), e),
            })?;
        info!(
            partition = %partition.id,
            path = %input.path.display(),
            features = collection.features.len(),
            "loaded input collection"
        );
        collections.push(SourceCollection::new(collection, input.source_label.clone()));
    }

    if collections.is_empty() {
        return Err(DedupeError::PartitionRead {
            partition: partition.id.clone(),
            message: "no input collections found".to_string(),
        });
    }

    let outcome = clean_and_merge(&collections, config)?;
    geojson::save_collection(&partition.output, &outcome.collection)?;

    Ok(PartitionOutcome {
        partition: partition.id.clone(),
        summary: outcome.summary,
        output: partition.output.clone(),
    })
}

/// Run many partitions concurrently. Configuration problems are fatal up
/// front; a partition failure is isolated, logged, and reported in the
/// returned `MergeReport` while the remaining partitions complete.
pub async fn run_partitions(
    partitions: Vec<PartitionInput>,
    config: &DedupeConfig,
) -> Result<MergeReport> {
    config.validate()?;

    let mut handles = Vec::with_capacity(partitions.len());
    for partition in partitions {
        let config = config.clone();
        let id = partition.id.clone();
        let handle =
            tokio::task::spawn_blocking(move || run_partition(&partition, &config));
        handles.push((id, handle));
    }

    let mut report = MergeReport::default();
    for (id, handle) in handles {
        match handle.await {
            Ok(Ok(outcome)) => {
                metrics::partitions::completed();
                report.outcomes.push(outcome);
            }
            Ok(Err(error)) => {
                warn!(partition = %id, %error, "partition failed");
                metrics::partitions::failed();
                report.failed.push(PartitionFailure {
                    partition: id,
                    message: error.to_string(),
                });
            }
            Err(join_error) => {
                warn!(partition = %id, %join_error, "partition task aborted");
                metrics::partitions::failed();
                report.failed.push(PartitionFailure {
                    partition: id,
                    message: format!("task aborted: {join_error}"),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::geojson::Feature;
    use serde_json::json;

    fn feature(name: &str, lat: f64, lon: f64, extra: serde_json::Value) -> Feature {
        let mut properties = serde_json::Map::new();
        properties.insert("name".to_string(), json!(name));
        if let Some(map) = extra.as_object() {
            for (k, v) in map {
                properties.insert(k.clone(), v.clone());
            }
        }
        Feature {
            feature_type: "Feature".to_string(),
            geometry: Some(crate::ingestion::Geometry {
                geometry_type: "Point".to_string(),
                coordinates: json!([lon, lat]),
            }),
            properties,
        }
    }

    fn source(features: Vec<Feature>, label: &str) -> SourceCollection {
        SourceCollection::new(FeatureCollection::new(features), Some(label.to_string()))
    }

    #[test]
    fn merges_across_collections_and_tracks_provenance() {
        let gov = source(
            vec![feature(
                "Pine Ridge Campground",
                40.0000,
                -105.0000,
                json!({"rating": 4.2}),
            )],
            "recreation.gov",
        );
        let osm = source(
            vec![feature(
                "Pine Ridge Campground",
                40.0002,
                -105.0000,
                json!({"phone": "555-0100"}),
            )],
            "osm",
        );

        let outcome = clean_and_merge(&[gov, osm], &DedupeConfig::default()).unwrap();
        assert_eq!(outcome.summary.input_records, 2);
        assert_eq!(outcome.summary.unique_records, 1);
        assert_eq!(outcome.summary.duplicates_merged, 1);

        let properties = &outcome.collection.features[0].properties;
        assert_eq!(properties["_sources"], json!("recreation.gov, osm"));
        assert_eq!(properties["_dedupe_group_size"], json!(2));
        assert_eq!(properties["_deduped"], json!(true));
        assert_eq!(properties["rating"], json!(4.2));
        assert_eq!(properties["phone"], json!("555-0100"));
    }

    #[test]
    fn placeholder_and_sentinel_records_are_dropped() {
        let input = source(
            vec![
                feature("Sample Test Site", 10.0, 10.0, json!({})),
                feature("Real Campground", 10.0, 10.5, json!({})),
                feature("Null Island Camp", 0.0, 0.0, json!({})),
            ],
            "osm",
        );
        let outcome = clean_and_merge(&[input], &DedupeConfig::default()).unwrap();
        assert_eq!(outcome.summary.unique_records, 1);
        assert_eq!(outcome.summary.rejected["placeholder_name"], 1);
        assert_eq!(outcome.summary.rejected["null_island"], 1);
        assert_eq!(
            outcome.collection.features[0].properties["name"],
            json!("Real Campground")
        );
    }

    #[test]
    fn output_shrinks_monotonically_and_accounts_for_groups() {
        let input = source(
            vec![
                feature("Eagle Creek Camp", 40.0000, -105.0000, json!({})),
                feature("Eagle Creek Camp", 40.0003, -105.0000, json!({})),
                feature("Eagle Creek Camp", 40.0006, -105.0001, json!({})),
                feature("Granite Basin", 41.0000, -106.0000, json!({})),
            ],
            "osm",
        );
        let outcome = clean_and_merge(&[input], &DedupeConfig::default()).unwrap();
        let summary = &outcome.summary;

        assert!(summary.unique_records <= summary.input_records);

        let absorbed: usize = outcome
            .collection
            .features
            .iter()
            .filter_map(|f| f.properties.get("_dedupe_group_size"))
            .filter_map(|v| v.as_u64())
            .map(|size| size as usize - 1)
            .sum();
        assert_eq!(summary.kept_records - summary.unique_records, absorbed);
        assert_eq!(summary.duplicates_merged, absorbed);
    }

    #[test]
    fn rerunning_on_own_output_is_a_fixed_point() {
        let config = DedupeConfig::default();
        let input = source(
            vec![
                feature("Eagle Creek Camp", 40.0000, -105.0000, json!({"rating": 4.0})),
                feature("Eagle Creek Camp", 40.0003, -105.0000, json!({})),
                feature("Granite Basin", 41.0000, -106.0000, json!({})),
            ],
            "osm",
        );
        let first = clean_and_merge(&[input], &config).unwrap();

        let again = SourceCollection::new(first.collection, None);
        let second = clean_and_merge(&[again], &config).unwrap();

        assert_eq!(
            second.summary.unique_records,
            first.summary.unique_records
        );
        assert_eq!(second.summary.duplicates_merged, 0);
    }

    #[test]
    fn keep_best_false_concatenates_without_deduplicating() {
        let config = DedupeConfig {
            keep_best: false,
            ..Default::default()
        };
        let input = source(
            vec![
                feature("Eagle Creek Camp", 40.0000, -105.0000, json!({})),
                feature("Eagle Creek Camp", 40.0001, -105.0000, json!({})),
            ],
            "osm",
        );
        let outcome = clean_and_merge(&[input], &config).unwrap();
        assert_eq!(outcome.summary.unique_records, 2);
        assert_eq!(outcome.summary.duplicates_merged, 0);
    }

    #[test]
    fn invalid_configuration_is_fatal_before_processing() {
        let config = DedupeConfig {
            radius_meters: 0.0,
            ..Default::default()
        };
        let input = source(vec![feature("Eagle Creek Camp", 40.0, -105.0, json!({}))], "osm");
        assert!(matches!(
            clean_and_merge(&[input], &config),
            Err(DedupeError::Config { .. })
        ));
    }

    #[test]
    fn stats_reflect_emitted_collection() {
        let input = source(
            vec![
                feature("Eagle Creek Camp", 40.0, -105.0, json!({"rating": 4.0, "cost": 0})),
                feature("Granite Basin", 41.0, -106.0, json!({"cost": 25})),
            ],
            "recreation.gov",
        );
        let outcome = clean_and_merge(&[input], &DedupeConfig::default()).unwrap();
        let stats = &outcome.summary.stats;
        assert_eq!(stats.rated, 1);
        assert_eq!(stats.free, 1);
        assert_eq!(stats.paid, 1);
        assert_eq!(stats.per_source["recreation.gov"], 2);
    }
}

//! Canonical selection and attribute merge.
//!
//! Each cluster collapses to one [`MergedRecord`]: the highest-scoring
//! member becomes the canonical record, and the others only fill gaps in it.
//! A populated canonical value is never overwritten.

use chrono::Utc;
use tracing::debug;

use crate::domain::{AttrValue, Cluster, MergedRecord, PointRecord};
use crate::observability::metrics;
use crate::pipeline::config::DedupeConfig;

/// Completeness/trust score used to pick the canonical record of a cluster.
/// Additive and independent per signal; higher is better.
pub fn score_record(record: &PointRecord, config: &DedupeConfig) -> i32 {
    let mut score = 0;

    if record.name.trim().chars().count() > 3 {
        score += 3;
    }
    if let Some(AttrValue::Text(description)) = record.attr("description") {
        if description.trim().chars().count() > 10 {
            score += 2;
        }
    }
    if record.has_value("rating") {
        score += 2;
    }
    if record.has_value("reviews") {
        score += 2;
    }
    if record.has_value("phone") {
        score += 1;
    }
    if record.has_value("website") {
        score += 1;
    }

    score + config.trust_weight(&record.source)
}

/// Split a cluster into its canonical record and the rest, preserving the
/// cluster order of the rest. Ties go to the earliest member, so selection
/// is deterministic for a fixed input order.
pub fn select_canonical(cluster: Cluster, config: &DedupeConfig) -> (PointRecord, Vec<PointRecord>) {
    let mut members = cluster.members;

    let mut best_index = 0;
    let mut best_score = score_record(&members[0], config);
    for (index, member) in members.iter().enumerate().skip(1) {
        let score = score_record(member, config);
        if score > best_score {
            best_index = index;
            best_score = score;
        }
    }

    let canonical = members.remove(best_index);
    (canonical, members)
}

/// Collapse a cluster into one merged record. Singleton clusters pass
/// through with their attributes untouched.
pub fn merge_cluster(cluster: Cluster, config: &DedupeConfig) -> MergedRecord {
    let group_size = cluster.len();
    let (mut canonical, others) = select_canonical(cluster, config);

    let mut sources = Vec::new();
    // The canonical's own source always survives, even when configured as
    // ignored, so singleton provenance is exactly the original source.
    push_source(&mut sources, &canonical.source, &[]);

    for other in &others {
        for (key, value) in &other.attributes {
            merge_attribute(&mut canonical, key, value);
        }
        push_source(&mut sources, &other.source, &config.ignored_sources);
    }

    if group_size > 1 {
        debug!(
            canonical = %canonical.name,
            absorbed = others.len(),
            "merged duplicate group"
        );
        metrics::conflation::records_merged(others.len());
    } else {
        metrics::conflation::singletons_passed();
    }

    MergedRecord {
        record: canonical,
        sources,
        group_size,
        merged_at: Utc::now(),
    }
}

/// Merge one attribute from a non-canonical member: lists union, everything
/// else fills gaps only.
fn merge_attribute(canonical: &mut PointRecord, key: &str, value: &AttrValue) {
    if let Some(existing) = canonical.attributes.get_mut(key) {
        match (existing, value) {
            (AttrValue::List(current), AttrValue::List(incoming)) => {
                for item in incoming {
                    if !current.contains(item) {
                        current.push(item.clone());
                    }
                }
            }
            (existing, incoming) => {
                if existing.is_gap() && !incoming.is_gap() {
                    *existing = incoming.clone();
                }
            }
        }
    } else if !value.is_gap() {
        canonical.attributes.insert(key.to_string(), value.clone());
    }
}

fn push_source(sources: &mut Vec<String>, source: &str, ignored: &[String]) {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return;
    }
    if ignored.iter().any(|i| i == trimmed) {
        return;
    }
    if !sources.iter().any(|s| s == trimmed) {
        sources.push(trimmed.to_string());
    }
}

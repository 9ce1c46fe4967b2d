//! Greedy single-link seeded clustering.
//!
//! Records are walked in the order the partition provided them; each
//! unassigned record seeds a cluster and every later unassigned record is
//! compared against that seed only. Output therefore depends on input order
//! — callers get reproducible results by passing a stable order, and the
//! ordering contract is part of the public API, not an accident of
//! iteration.
//!
//! Membership is decided only against the seed, never between non-seed
//! members (no transitive closure). A chain A–B–C where only adjacent pairs
//! match can cluster differently depending on which record seeds first; this
//! matches the long-standing merge behavior and is kept deliberately.

use tracing::debug;

use crate::domain::{Cluster, PointRecord};
use crate::matching::geo::haversine_meters;
use crate::matching::text::similarity_normalized;
use crate::observability::metrics;
use crate::pipeline::config::DedupeConfig;

/// Partition the records into duplicate-candidate clusters. Consumes the
/// records; every input record ends up in exactly one cluster.
pub fn cluster_records(records: Vec<PointRecord>, config: &DedupeConfig) -> Vec<Cluster> {
    let total = records.len();
    let mut slots: Vec<Option<PointRecord>> = records.into_iter().map(Some).collect();
    let mut clusters = Vec::new();
    let mut comparisons = 0usize;

    for i in 0..slots.len() {
        let seed = match slots[i].take() {
            Some(seed) => seed,
            None => continue,
        };
        let mut members = vec![seed];

        for slot in slots.iter_mut().skip(i + 1) {
            let candidate = match slot.as_ref() {
                Some(candidate) => candidate,
                None => continue,
            };
            comparisons += 1;
            if is_duplicate_of_seed(&members[0], candidate, config) {
                members.push(slot.take().expect("candidate still present"));
            }
        }

        clusters.push(Cluster { members });
    }

    debug!(
        records = total,
        clusters = clusters.len(),
        comparisons, "clustering complete"
    );
    metrics::cluster::clusters_formed(clusters.len());
    metrics::cluster::comparisons(comparisons);

    clusters
}

/// The membership predicate: within the inner radius two records are
/// duplicates no matter what they are called; between the inner and outer
/// radius the names must also agree.
fn is_duplicate_of_seed(seed: &PointRecord, candidate: &PointRecord, config: &DedupeConfig) -> bool {
    let distance = haversine_meters(seed.coordinates, candidate.coordinates);

    if distance < config.inner_radius_meters {
        return true;
    }
    if distance > config.radius_meters {
        return false;
    }

    similarity_normalized(
        &seed.normalized_name,
        &candidate.normalized_name,
        config.name_metric,
    ) >= config.name_similarity_threshold
}

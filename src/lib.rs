//! Campsite data deduplication and merge pipeline.
//!
//! Takes point feature collections from overlapping sources (Recreation.gov,
//! OpenStreetMap, curated lists) and produces one collection where each
//! real-world location appears once, with the most complete known attributes
//! and a provenance trail of the sources that contributed to it.

pub mod common;
pub mod domain;
pub mod ingestion;
pub mod matching;
pub mod observability;
pub mod pipeline;

// Re-export the types most callers need
pub use common::error::{DedupeError, Result};
pub use domain::{AttrValue, Cluster, Coordinates, MergedRecord, PointRecord};
pub use ingestion::geojson::{FeatureCollection, SourceCollection};
pub use pipeline::config::{DedupeConfig, TrustPattern, TrustTier};
pub use pipeline::orchestrator::{clean_and_merge, DedupeOutcome, MergeReport};

//! Point feature collection I/O.
//!
//! The input shape is the GeoJSON subset every upstream feed uses: a
//! `FeatureCollection` of `Point` features with free-form properties.
//! Geometry coordinates are kept as raw JSON here; shape problems are
//! per-record concerns handled by the normalizer, not load failures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::error::{DedupeError, Result};
use crate::domain::MergedRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            collection_type: "FeatureCollection".to_string(),
            features,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub feature_type: String,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub geometry_type: String,
    pub coordinates: Value,
}

/// One raw input collection paired with the caller's fallback source label,
/// used when a feature's properties carry no source of their own.
#[derive(Debug, Clone)]
pub struct SourceCollection {
    pub collection: FeatureCollection,
    pub source_fallback: Option<String>,
}

impl SourceCollection {
    pub fn new(collection: FeatureCollection, source_fallback: Option<String>) -> Self {
        Self {
            collection,
            source_fallback,
        }
    }
}

/// Load a feature collection from disk.
pub fn load_collection(path: &Path) -> Result<FeatureCollection> {
    let content = fs::read_to_string(path)?;
    let collection: FeatureCollection = serde_json::from_str(&content)?;

    if collection.collection_type != "FeatureCollection" {
        return Err(DedupeError::InvalidCollection {
            message: format!(
                "{}: expected type \"FeatureCollection\", found \"{}\"",
                path.display(),
                collection.collection_type
            ),
        });
    }

    Ok(collection)
}

/// Write a feature collection to disk, pretty-printed like the upstream
/// data files so diffs stay reviewable.
pub fn save_collection(path: &Path, collection: &FeatureCollection) -> Result<()> {
    let json = serde_json::to_string_pretty(collection)?;
    fs::write(path, json)?;
    Ok(())
}

/// Emit a merged record back into feature shape. Records that absorbed
/// duplicates carry the dedupe markers; singletons pass through without them.
pub fn feature_from_merged(merged: &MergedRecord) -> Feature {
    let record = &merged.record;
    let mut properties = Map::new();

    for (key, value) in &record.attributes {
        properties.insert(key.clone(), value.to_json());
    }

    properties.insert("id".to_string(), Value::String(record.id.clone()));
    properties.insert("name".to_string(), Value::String(record.name.clone()));
    properties.insert("source".to_string(), Value::String(record.source.clone()));

    if merged.group_size > 1 {
        properties.insert(
            "_sources".to_string(),
            Value::String(merged.sources.join(", ")),
        );
        properties.insert(
            "_dedupe_group_size".to_string(),
            Value::Number(merged.group_size.into()),
        );
        properties.insert("_deduped".to_string(), Value::Bool(true));
    }

    Feature {
        feature_type: "Feature".to_string(),
        geometry: Some(Geometry {
            geometry_type: "Point".to_string(),
            coordinates: Value::Array(vec![
                serde_json::json!(record.coordinates.lon),
                serde_json::json!(record.coordinates.lat),
            ]),
        }),
        properties,
    }
}

pub fn collection_from_merged(records: &[MergedRecord]) -> FeatureCollection {
    FeatureCollection::new(records.iter().map(feature_from_merged).collect())
}

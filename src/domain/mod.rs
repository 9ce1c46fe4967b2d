use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated WGS84 position.
///
/// Constructed only through [`Coordinates::new`], so a value of this type is
/// always finite, in range, and never the (0,0) "no data" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Validate a latitude/longitude pair. Returns `None` for non-finite or
    /// out-of-range values, and for exactly (0,0) — several upstream feeds
    /// use null island as a placeholder for missing geometry.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        if lat == 0.0 && lon == 0.0 {
            return None;
        }
        Some(Self { lat, lon })
    }
}

/// A single value in the open attribute map.
///
/// Campsite properties have no fixed schema across sources, so attributes are
/// a typed open mapping rather than a struct. Nested JSON objects are not
/// representable and are dropped during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Convert a raw GeoJSON property value. `None` for nulls and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(AttrValue::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(AttrValue::Number),
            serde_json::Value::String(s) => Some(AttrValue::Text(s.clone())),
            serde_json::Value::Array(items) => Some(AttrValue::List(
                items.iter().filter_map(AttrValue::from_json).collect(),
            )),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
            AttrValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttrValue::Text(s) => serde_json::Value::String(s.clone()),
            AttrValue::List(items) => {
                serde_json::Value::Array(items.iter().map(AttrValue::to_json).collect())
            }
        }
    }

    /// Whether this value counts as "missing" for gap-filling purposes:
    /// empty/whitespace text, numeric zero, or an empty list. Booleans are
    /// never gaps — `false` is real data.
    pub fn is_gap(&self) -> bool {
        match self {
            AttrValue::Text(s) => s.trim().is_empty(),
            AttrValue::Number(n) => *n == 0.0,
            AttrValue::List(items) => items.is_empty(),
            AttrValue::Bool(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

/// One location observation from one source, after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Identifier unique within the source; generated when the feed has none.
    pub id: String,
    pub coordinates: Coordinates,
    /// Display name as the source published it, trimmed.
    pub name: String,
    /// Canonical form of the name used for matching (see `matching::text`).
    pub normalized_name: String,
    /// Open attribute map; keys are already synonym-collapsed.
    pub attributes: BTreeMap<String, AttrValue>,
    /// Origin dataset identifier, used for trust scoring and provenance.
    pub source: String,
}

impl PointRecord {
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Whether `key` is present with a non-gap value.
    pub fn has_value(&self, key: &str) -> bool {
        self.attributes.get(key).map_or(false, |v| !v.is_gap())
    }
}

/// An ordered set of records believed to denote one real-world location.
/// The first member is the seed the others were matched against.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub members: Vec<PointRecord>,
}

impl Cluster {
    pub fn seed(&self) -> &PointRecord {
        &self.members[0]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The deduplicated output record: one canonical observation plus the
/// provenance of everything that was absorbed into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedRecord {
    pub record: PointRecord,
    /// Distinct contributing source identifiers, canonical's source first.
    pub sources: Vec<String>,
    /// Number of records absorbed; 1 when no duplicates were found.
    pub group_size: usize,
    pub merged_at: DateTime<Utc>,
}

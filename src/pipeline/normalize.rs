//! Raw feature → [`PointRecord`] conversion.
//!
//! Pure per-record transform: validates geometry, collapses synonym property
//! keys into one shape, and converts properties into the typed attribute
//! map. Anything that fails validation becomes a [`RejectReason`] for the
//! caller to count and drop.

use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use super::RejectReason;
use crate::domain::{AttrValue, Coordinates, PointRecord};
use crate::ingestion::Feature;
use crate::matching::text::normalize_name;

/// Property keys folded into a canonical key. The canonical key's own value
/// wins when present; otherwise the first non-gap synonym in listed order.
const SYNONYM_KEYS: &[(&str, &[&str])] = &[
    ("name", &["title", "site_name", "location_name"]),
    ("category", &["type", "kind"]),
    ("source", &["provider", "dataset"]),
    ("reviews", &["review_count", "reviews_count"]),
    ("website", &["url"]),
];

pub fn normalize_feature(
    feature: &Feature,
    position: usize,
    source_fallback: Option<&str>,
) -> Result<PointRecord, RejectReason> {
    let coordinates = extract_coordinates(feature)?;

    let mut attributes = convert_properties(feature);
    collapse_synonyms(&mut attributes);

    let name = attributes
        .remove("name")
        .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
        .unwrap_or_default();

    let source = attributes
        .remove("source")
        .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .or_else(|| source_fallback.map(|s| s.trim().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    if !attributes.contains_key("category") {
        attributes.insert("category".to_string(), AttrValue::from("campsite"));
    }

    let id = attributes
        .remove("id")
        .map(|v| match v {
            AttrValue::Text(s) => s,
            AttrValue::Number(n) => format_id_number(n),
            other => other
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| stable_id(&source, position)),
        })
        .unwrap_or_else(|| stable_id(&source, position));

    let normalized_name = normalize_name(&name);

    Ok(PointRecord {
        id,
        coordinates,
        name,
        normalized_name,
        attributes,
        source,
    })
}

fn extract_coordinates(feature: &Feature) -> Result<Coordinates, RejectReason> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or(RejectReason::MissingGeometry)?;

    if geometry.geometry_type != "Point" {
        return Err(RejectReason::NotAPoint);
    }

    // GeoJSON point order is [longitude, latitude]
    let pair = geometry
        .coordinates
        .as_array()
        .filter(|c| c.len() >= 2)
        .ok_or(RejectReason::MalformedCoordinates)?;
    let lon = pair[0].as_f64().ok_or(RejectReason::MalformedCoordinates)?;
    let lat = pair[1].as_f64().ok_or(RejectReason::MalformedCoordinates)?;

    if !lat.is_finite() || !lon.is_finite() {
        return Err(RejectReason::MalformedCoordinates);
    }

    match Coordinates::new(lat, lon) {
        Some(coordinates) => Ok(coordinates),
        None if lat == 0.0 && lon == 0.0 => Err(RejectReason::NullIsland),
        None => Err(RejectReason::OutOfRange),
    }
}

fn convert_properties(feature: &Feature) -> BTreeMap<String, AttrValue> {
    let mut attributes = BTreeMap::new();
    for (key, value) in &feature.properties {
        match AttrValue::from_json(value) {
            Some(attr) => {
                attributes.insert(key.clone(), attr);
            }
            None if !value.is_null() => {
                debug!(key = %key, "dropping non-scalar property value");
            }
            None => {}
        }
    }
    attributes
}

fn collapse_synonyms(attributes: &mut BTreeMap<String, AttrValue>) {
    for (canonical, synonyms) in SYNONYM_KEYS {
        let mut winner = attributes
            .get(*canonical)
            .filter(|v| !v.is_gap())
            .cloned();

        for synonym in *synonyms {
            let candidate = attributes.remove(*synonym);
            if winner.is_none() {
                winner = candidate.filter(|v| !v.is_gap());
            }
        }

        if let Some(value) = winner {
            attributes.insert((*canonical).to_string(), value);
        }
    }
}

/// Deterministic id for records that arrive without one: the same source,
/// position, and run inputs always produce the same id.
fn stable_id(source: &str, position: usize) -> String {
    let seed = format!("{source}:{position}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()).to_string()
}

fn format_id_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

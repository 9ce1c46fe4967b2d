use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::error::{DedupeError, Result};
use crate::matching::text::{normalize_name, NameMetric};

/// Trust tier assigned to a source by pattern matching. Authoritative feeds
/// (government registries) outrank community-mapped ones when picking the
/// canonical record of a duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    Authoritative,
    Community,
}

impl TrustTier {
    pub fn weight(&self) -> i32 {
        match self {
            TrustTier::Authoritative => 2,
            TrustTier::Community => 1,
        }
    }
}

/// Substring pattern mapping a source name to a trust tier. Patterns are
/// checked in order against the normalized source name; first match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustPattern {
    pub pattern: String,
    pub tier: TrustTier,
}

impl TrustPattern {
    pub fn new(pattern: &str, tier: TrustTier) -> Self {
        Self {
            pattern: pattern.to_string(),
            tier,
        }
    }
}

/// Configuration for one dedupe run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    /// Outer radius: beyond this, two records are never duplicates.
    pub radius_meters: f64,
    /// Minimum name similarity required inside the outer radius.
    pub name_similarity_threshold: f64,
    /// Inner radius: closer than this, records are duplicates regardless
    /// of name.
    pub inner_radius_meters: f64,
    pub name_metric: NameMetric,
    pub source_trust_patterns: Vec<TrustPattern>,
    /// Junk tokens; a normalized name containing any of these is dropped.
    pub placeholder_blocklist: Vec<String>,
    /// Names that are exactly one of these after normalization are dropped.
    pub generic_names: Vec<String>,
    /// Source identifiers excluded from merged provenance lists.
    pub ignored_sources: Vec<String>,
    /// When false, skip clustering and canonical selection entirely and
    /// emit the cleaned records as-is (concatenation mode).
    pub keep_best: bool,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            radius_meters: 250.0,
            name_similarity_threshold: 0.82,
            inner_radius_meters: 100.0,
            name_metric: NameMetric::TokenOverlap,
            source_trust_patterns: vec![
                TrustPattern::new("recreation", TrustTier::Authoritative),
                TrustPattern::new("ridb", TrustTier::Authoritative),
                TrustPattern::new("rec gov", TrustTier::Authoritative),
                TrustPattern::new("opencampingmap", TrustTier::Community),
                TrustPattern::new("ocm", TrustTier::Community),
                TrustPattern::new("osm", TrustTier::Community),
            ],
            placeholder_blocklist: [
                "sample",
                "test",
                "placeholder",
                "lorem",
                "ipsum",
                "demo",
                "fake",
                "unknown campsite",
                "tbd",
                "coming soon",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            generic_names: [
                "unnamed site",
                "unnamed site osm",
                "unnamed campsite",
                "no name",
                "untitled",
                "unknown",
                "site",
                "campsite",
                "camping",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            ignored_sources: vec!["unknown".to_string()],
            keep_best: true,
        }
    }
}

impl DedupeConfig {
    /// Fine-grained profile for same-area duplicate collapse.
    pub fn fine() -> Self {
        Self::default()
    }

    /// Coarse profile for merging whole regional datasets: wider radius and
    /// an edit-distance metric tolerant of spelling drift between feeds.
    pub fn coarse() -> Self {
        Self {
            radius_meters: 500.0,
            name_similarity_threshold: 0.6,
            name_metric: NameMetric::Levenshtein,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file. Unspecified fields keep their
    /// defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DedupeError::Config {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Fail-fast validation, run before any partition is processed. A bad
    /// configuration is a caller bug, not a data problem.
    pub fn validate(&self) -> Result<()> {
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            return Err(DedupeError::Config {
                message: format!("radius_meters must be positive, got {}", self.radius_meters),
            });
        }
        if !(0.0..=1.0).contains(&self.name_similarity_threshold) {
            return Err(DedupeError::Config {
                message: format!(
                    "name_similarity_threshold must be within [0, 1], got {}",
                    self.name_similarity_threshold
                ),
            });
        }
        if !self.inner_radius_meters.is_finite() || self.inner_radius_meters < 0.0 {
            return Err(DedupeError::Config {
                message: format!(
                    "inner_radius_meters must be non-negative, got {}",
                    self.inner_radius_meters
                ),
            });
        }
        if self.inner_radius_meters > self.radius_meters {
            return Err(DedupeError::Config {
                message: format!(
                    "inner_radius_meters ({}) exceeds radius_meters ({})",
                    self.inner_radius_meters, self.radius_meters
                ),
            });
        }
        Ok(())
    }

    /// Trust score contribution for a source name: the weight of the first
    /// matching pattern, 0 when nothing matches.
    pub fn trust_weight(&self, source: &str) -> i32 {
        let normalized = normalize_name(source);
        self.source_trust_patterns
            .iter()
            .find(|p| normalized.contains(&p.pattern))
            .map_or(0, |p| p.tier.weight())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        DedupeConfig::default().validate().unwrap();
        DedupeConfig::coarse().validate().unwrap();
    }

    #[test]
    fn bad_radius_is_fatal() {
        let config = DedupeConfig {
            radius_meters: -5.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DedupeError::Config { .. })
        ));
    }

    #[test]
    fn threshold_outside_unit_interval_is_fatal() {
        let config = DedupeConfig {
            name_similarity_threshold: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn inner_radius_cannot_exceed_outer() {
        let config = DedupeConfig {
            inner_radius_meters: 300.0,
            radius_meters: 250.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn trust_weight_matches_normalized_source_substrings() {
        let config = DedupeConfig::default();
        assert_eq!(config.trust_weight("Recreation.gov"), 2);
        assert_eq!(config.trust_weight("RIDB export 2023"), 2);
        assert_eq!(config.trust_weight("OpenCampingMap"), 1);
        assert_eq!(config.trust_weight("osm"), 1);
        assert_eq!(config.trust_weight("campendium"), 0);
    }

    #[test]
    fn first_pattern_wins() {
        let config = DedupeConfig {
            source_trust_patterns: vec![
                TrustPattern::new("gov", TrustTier::Community),
                TrustPattern::new("recreation", TrustTier::Authoritative),
            ],
            ..Default::default()
        };
        // "recreation gov" matches both; the earlier pattern decides
        assert_eq!(config.trust_weight("recreation.gov"), 1);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: DedupeConfig =
            toml::from_str("radius_meters = 400.0\nname_metric = \"levenshtein\"").unwrap();
        assert_eq!(config.radius_meters, 400.0);
        assert_eq!(config.name_metric, NameMetric::Levenshtein);
        assert_eq!(config.name_similarity_threshold, 0.82);
        assert!(config.keep_best);
    }
}

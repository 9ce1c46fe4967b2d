//! Placeholder and junk-name rejection.
//!
//! Runs on normalized records, between normalization and clustering. Several
//! upstream feeds contain seeded test rows ("Sample Campsite", "Staff Row")
//! and unnamed stubs that would otherwise pollute duplicate groups.

use super::RejectReason;
use crate::domain::PointRecord;
use crate::matching::text::normalize_name;
use crate::pipeline::config::DedupeConfig;

pub struct QualityGate {
    blocklist: Vec<String>,
    generic_names: Vec<String>,
}

impl QualityGate {
    pub fn new(config: &DedupeConfig) -> Self {
        Self {
            blocklist: config
                .placeholder_blocklist
                .iter()
                .map(|t| normalize_name(t))
                .filter(|t| !t.is_empty())
                .collect(),
            generic_names: config
                .generic_names
                .iter()
                .map(|t| normalize_name(t))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Accept or reject one normalized record. Checks run on the normalized
    /// name; blocklist tokens match as substrings, generic names exactly.
    pub fn assess(&self, record: &PointRecord) -> Result<(), RejectReason> {
        let name = &record.normalized_name;

        if name.chars().count() < 3 {
            return Err(RejectReason::NameTooShort);
        }

        if self.blocklist.iter().any(|token| name.contains(token)) {
            return Err(RejectReason::PlaceholderName);
        }

        if self.generic_names.iter().any(|generic| generic == name) {
            return Err(RejectReason::GenericName);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coordinates;

    fn record(name: &str) -> PointRecord {
        PointRecord {
            id: "r1".to_string(),
            coordinates: Coordinates::new(40.0, -105.0).unwrap(),
            name: name.to_string(),
            normalized_name: normalize_name(name),
            attributes: Default::default(),
            source: "osm".to_string(),
        }
    }

    #[test]
    fn placeholder_names_are_rejected_by_substring() {
        let gate = QualityGate::new(&DedupeConfig::default());
        assert_eq!(
            gate.assess(&record("Sample Test Site")),
            Err(RejectReason::PlaceholderName)
        );
        assert_eq!(
            gate.assess(&record("Lorem Ipsum Meadow")),
            Err(RejectReason::PlaceholderName)
        );
        assert_eq!(
            gate.assess(&record("Coming Soon - New Campground")),
            Err(RejectReason::PlaceholderName)
        );
    }

    #[test]
    fn short_and_empty_names_are_rejected() {
        let gate = QualityGate::new(&DedupeConfig::default());
        assert_eq!(gate.assess(&record("")), Err(RejectReason::NameTooShort));
        assert_eq!(gate.assess(&record("  ")), Err(RejectReason::NameTooShort));
        assert_eq!(gate.assess(&record("ab")), Err(RejectReason::NameTooShort));
    }

    #[test]
    fn generic_names_match_exactly_not_by_substring() {
        let gate = QualityGate::new(&DedupeConfig::default());
        assert_eq!(
            gate.assess(&record("Unnamed Site")),
            Err(RejectReason::GenericName)
        );
        assert_eq!(
            gate.assess(&record("Unnamed Site (OSM)")),
            Err(RejectReason::GenericName)
        );
        // "campsite" is generic on its own but fine inside a real name
        assert_eq!(
            gate.assess(&record("Campsite")),
            Err(RejectReason::GenericName)
        );
        assert!(gate.assess(&record("Eagle Creek Campsite")).is_ok());
    }

    #[test]
    fn real_names_pass() {
        let gate = QualityGate::new(&DedupeConfig::default());
        assert!(gate.assess(&record("Pine Ridge Campground")).is_ok());
        assert!(gate.assess(&record("Mary's Cove")).is_ok());
    }

    #[test]
    fn blocklist_is_configurable() {
        let config = DedupeConfig {
            placeholder_blocklist: vec!["staff row".to_string()],
            ..Default::default()
        };
        let gate = QualityGate::new(&config);
        assert_eq!(
            gate.assess(&record("Staff Row")),
            Err(RejectReason::PlaceholderName)
        );
        // default tokens no longer apply
        assert!(gate.assess(&record("Sample Meadow")).is_ok());
    }
}

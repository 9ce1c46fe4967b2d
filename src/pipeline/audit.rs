//! Dataset audit.
//!
//! Read-only sweep over a directory of GeoJSON files, flagging the problems
//! that historically crept into the published data: unreadable files, files
//! that are not point feature collections, empty collections, and seeded
//! placeholder rows. Produces a report; never mutates the data.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::error::Result;
use crate::ingestion::geojson;
use crate::pipeline::config::DedupeConfig;
use crate::pipeline::normalize::normalize_feature;
use crate::pipeline::quality_gate::QualityGate;
use crate::pipeline::RejectReason;

/// How many features of each file get sampled for placeholder content.
const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditIssueKind {
    Unreadable,
    Empty,
    PlaceholderData,
}

#[derive(Debug)]
pub struct AuditIssue {
    pub file: PathBuf,
    pub kind: AuditIssueKind,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct AuditReport {
    pub files_checked: usize,
    pub issues: Vec<AuditIssue>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Audit every `.geojson` file under `dir`, recursively.
pub fn audit_directory(dir: &Path, config: &DedupeConfig) -> Result<AuditReport> {
    let mut files = Vec::new();
    collect_geojson_files(dir, &mut files)?;
    files.sort();

    let gate = QualityGate::new(config);
    let mut report = AuditReport::default();

    for file in files {
        report.files_checked += 1;
        audit_file(&file, &gate, &mut report);
    }

    Ok(report)
}

fn collect_geojson_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_geojson_files(&path, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("geojson") {
            files.push(path);
        }
    }
    Ok(())
}

fn audit_file(file: &Path, gate: &QualityGate, report: &mut AuditReport) {
    let collection = match geojson::load_collection(file) {
        Ok(collection) => collection,
        Err(error) => {
            report.issues.push(AuditIssue {
                file: file.to_path_buf(),
                kind: AuditIssueKind::Unreadable,
                detail: error.to_string(),
            });
            return;
        }
    };

    if collection.features.is_empty() {
        report.issues.push(AuditIssue {
            file: file.to_path_buf(),
            kind: AuditIssueKind::Empty,
            detail: "0 features".to_string(),
        });
        return;
    }

    for (index, feature) in collection.features.iter().take(SAMPLE_SIZE).enumerate() {
        let record = match normalize_feature(feature, index, None) {
            Ok(record) => record,
            Err(reason) => {
                debug!(file = %file.display(), index, %reason, "unparseable sampled feature");
                continue;
            }
        };
        if let Err(RejectReason::PlaceholderName) = gate.assess(&record) {
            report.issues.push(AuditIssue {
                file: file.to_path_buf(),
                kind: AuditIssueKind::PlaceholderData,
                detail: format!("feature {index}: name '{}'", record.name),
            });
        }
    }
}

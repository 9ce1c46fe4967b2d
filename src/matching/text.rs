//! Name normalization and fuzzy name similarity.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static POSSESSIVES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[’']").expect("valid regex"));
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Canonical form of a free-text name used for all matching: trimmed,
/// case-folded, possessive apostrophes removed, remaining punctuation
/// replaced by spaces, whitespace collapsed. Idempotent.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let no_possessives = POSSESSIVES.replace_all(&lowered, "");
    let spaced = PUNCTUATION.replace_all(&no_possessives, " ");
    WHITESPACE.replace_all(spaced.trim(), " ").to_string()
}

/// Which name similarity metric to use when comparing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NameMetric {
    /// Whitespace-token overlap scored against the larger token set.
    #[default]
    TokenOverlap,
    /// Normalized Levenshtein similarity, scaled by the longer string.
    Levenshtein,
}

/// Similarity of two raw names in [0, 1]. Normalizes both sides first;
/// 0 when either normalizes to empty, 1 when they normalize identically.
pub fn name_similarity(a: &str, b: &str, metric: NameMetric) -> f64 {
    similarity_normalized(&normalize_name(a), &normalize_name(b), metric)
}

/// Similarity of two already-normalized names. The clustering loop caches
/// normalized names on records and calls this directly.
pub fn similarity_normalized(a: &str, b: &str, metric: NameMetric) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    match metric {
        NameMetric::TokenOverlap => token_overlap(a, b),
        NameMetric::Levenshtein => strsim::normalized_levenshtein(a, b),
    }
}

fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();

    let denom = tokens_a.len().max(tokens_b.len());
    if denom == 0 {
        return 0.0;
    }

    let common = tokens_a.intersection(&tokens_b).count();
    common as f64 / denom as f64
}

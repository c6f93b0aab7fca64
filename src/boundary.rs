//! Boundary filter: requests that must never be answered.
//!
//! Two checks run in fixed priority order and the first hit wins:
//!
//! 1. **Harm intent**: the query is matched against an ordered lexicon of
//!    case-insensitive patterns. A match is an [`ViolationCategory::Ethics`]
//!    violation with severity 1.0.
//! 2. **Restricted sources**: any evidence source in the proof chain that
//!    contains the restricted marker is a [`ViolationCategory::Legal`]
//!    violation with severity 0.9.
//!
//! A violation is reported, never persisted: the pipeline turns it straight
//! into a refusal.

use regex::Regex;
use serde::Serialize;

use crate::config::{compile_pattern, HarmPatternSpec};
use crate::error::ConfigError;
use crate::proof::ProofNode;

const HARM_SEVERITY: f64 = 1.0;
const RESTRICTED_SOURCE_SEVERITY: f64 = 0.9;

/// Kind of boundary a request crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationCategory {
    Ethics,
    Legal,
}

impl std::fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationCategory::Ethics => f.write_str("Ethics"),
            ViolationCategory::Legal => f.write_str("Legal"),
        }
    }
}

/// A detected boundary violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryViolation {
    pub category: ViolationCategory,
    pub reason: String,
    pub severity: f64,
}

#[derive(Debug, Clone)]
struct HarmPattern {
    label: String,
    regex: Regex,
}

/// Compiled harm lexicon plus restricted-source policy.
#[derive(Debug, Clone)]
pub struct BoundaryFilter {
    harm_patterns: Vec<HarmPattern>,
    /// Lower-cased marker, `None` when the scan is disabled.
    restricted_marker: Option<String>,
}

impl BoundaryFilter {
    pub fn new(
        lexicon: &[HarmPatternSpec],
        restricted_marker: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let harm_patterns = lexicon
            .iter()
            .map(|spec| {
                Ok(HarmPattern {
                    label: spec.label.clone(),
                    regex: compile_pattern("harm", &spec.pattern)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let restricted_marker = match restricted_marker {
            Some("") => return Err(ConfigError::EmptyRestrictedMarker),
            Some(marker) => Some(marker.to_lowercase()),
            None => None,
        };

        Ok(Self {
            harm_patterns,
            restricted_marker,
        })
    }

    /// Evaluate a query and its proof chain. Returns at most one violation.
    pub fn check(&self, query: &str, nodes: &[ProofNode]) -> Option<BoundaryViolation> {
        if let Some(pattern) = self.harm_patterns.iter().find(|p| p.regex.is_match(query)) {
            return Some(BoundaryViolation {
                category: ViolationCategory::Ethics,
                reason: format!(
                    "matched {} pattern: {}",
                    pattern.label,
                    pattern.regex.as_str()
                ),
                severity: HARM_SEVERITY,
            });
        }

        let marker = self.restricted_marker.as_deref()?;
        nodes
            .iter()
            .flat_map(|node| node.evidence.iter())
            .find(|e| e.source.to_lowercase().contains(marker))
            .map(|e| BoundaryViolation {
                category: ViolationCategory::Legal,
                reason: format!("uses restricted source \"{}\"", e.source),
                severity: RESTRICTED_SOURCE_SEVERITY,
            })
    }

    /// Number of harm patterns in the lexicon.
    pub fn lexicon_len(&self) -> usize {
        self.harm_patterns.len()
    }
}

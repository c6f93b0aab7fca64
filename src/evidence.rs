//! Evidence records: the typed support behind every knowledge-base fact.
//!
//! Evidence is immutable once created. When a fact is consulted during proof
//! construction its evidence is copied into the proof node, so no two nodes
//! ever share a record.

use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;

/// Kind of publication an evidence record comes from.
///
/// Serializes by symbolic name (`CLINICAL_GUIDELINE`, `RCT`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceType {
    #[serde(alias = "guideline")]
    ClinicalGuideline,
    #[serde(alias = "meta-analysis")]
    MetaAnalysis,
    #[serde(alias = "rct")]
    Rct,
    #[serde(alias = "observational")]
    Observational,
    #[serde(alias = "peer-reviewed")]
    PeerReviewed,
    #[serde(alias = "other")]
    Other,
}

impl EvidenceType {
    /// Symbolic name, identical to the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            EvidenceType::ClinicalGuideline => "CLINICAL_GUIDELINE",
            EvidenceType::MetaAnalysis => "META_ANALYSIS",
            EvidenceType::Rct => "RCT",
            EvidenceType::Observational => "OBSERVATIONAL",
            EvidenceType::PeerReviewed => "PEER_REVIEWED",
            EvidenceType::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single piece of evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Short summary of what the source says.
    pub content: String,
    /// Citation of the source (guideline body, journal, dataset).
    pub source: String,
    /// Publication kind.
    #[serde(rename = "type")]
    pub evidence_type: EvidenceType,
    /// Publication date as written by the source (e.g. `2023-06`).
    #[serde(default)]
    pub publication_date: Option<String>,
    /// Number of citations the source has received.
    #[serde(default)]
    pub citations: u32,
    /// Confidence in `[0, 1]` that the evidence supports its statement.
    #[serde(default)]
    pub confidence: f64,
}

impl Evidence {
    /// Create evidence with no publication date and zero citations.
    pub fn new(
        content: impl Into<String>,
        source: impl Into<String>,
        evidence_type: EvidenceType,
        confidence: f64,
    ) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            evidence_type,
            publication_date: None,
            citations: 0,
            confidence,
        }
    }

    /// Attach a publication date.
    pub fn with_publication_date(mut self, date: impl Into<String>) -> Self {
        self.publication_date = Some(date.into());
        self
    }

    /// Attach a citation count.
    pub fn with_citations(mut self, citations: u32) -> Self {
        self.citations = citations;
        self
    }

    /// Reject confidences that are not finite values in `[0, 1]`.
    pub fn validate(&self) -> Result<(), KnowledgeError> {
        if !is_unit_interval(self.confidence) {
            return Err(KnowledgeError::EvidenceConfidenceOutOfRange {
                source_name: self.source.clone(),
                confidence: self.confidence,
            });
        }
        Ok(())
    }
}

pub(crate) fn is_unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_type_serializes_by_name() {
        let json = serde_json::to_string(&EvidenceType::MetaAnalysis).unwrap();
        assert_eq!(json, "\"META_ANALYSIS\"");
        let json = serde_json::to_string(&EvidenceType::Rct).unwrap();
        assert_eq!(json, "\"RCT\"");
    }

    #[test]
    fn evidence_type_accepts_short_aliases() {
        let t: EvidenceType = serde_json::from_str("\"guideline\"").unwrap();
        assert_eq!(t, EvidenceType::ClinicalGuideline);
        let t: EvidenceType = serde_json::from_str("\"PEER_REVIEWED\"").unwrap();
        assert_eq!(t, EvidenceType::PeerReviewed);
    }

    #[test]
    fn evidence_type_field_is_named_type() {
        let e = Evidence::new("c", "AHA 2023", EvidenceType::Rct, 0.9);
        let value = serde_json::to_value(&e).unwrap();
        assert_eq!(value["type"], "RCT");
        assert!(value.get("evidence_type").is_none());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let e = Evidence::new("c", "s", EvidenceType::Other, 0.5)
            .with_publication_date("2023-01")
            .with_citations(12);
        assert_eq!(e.publication_date.as_deref(), Some("2023-01"));
        assert_eq!(e.citations, 12);
    }

    #[test]
    fn validate_rejects_out_of_range_confidence() {
        assert!(Evidence::new("c", "s", EvidenceType::Other, 1.0).validate().is_ok());
        assert!(Evidence::new("c", "s", EvidenceType::Other, 0.0).validate().is_ok());
        assert!(Evidence::new("c", "s", EvidenceType::Other, 1.01).validate().is_err());
        assert!(Evidence::new("c", "s", EvidenceType::Other, f64::NAN).validate().is_err());
    }
}

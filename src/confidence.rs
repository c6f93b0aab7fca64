//! Confidence aggregation and discrete certification bands.
//!
//! Once a band is reached the reported value is the band's canonical value,
//! not the raw mean: PROVEN always reports 1.0 and HIGH always reports 0.95.
//! Only MEDIUM passes the raw mean through.

use serde::Serialize;

use crate::proof::{ProofChain, INSUFFICIENT_EVIDENCE};

/// Mean confidence at or above which a chain is PROVEN.
pub const PROVEN_THRESHOLD: f64 = 0.95;
/// Mean confidence at or above which a chain is HIGH.
pub const HIGH_THRESHOLD: f64 = 0.90;

/// Discrete confidence band. Serializes by symbolic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLabel {
    Insufficient,
    Medium,
    High,
    Proven,
}

impl ConfidenceLabel {
    /// Nominal value of the band.
    pub fn canonical_value(self) -> f64 {
        match self {
            ConfidenceLabel::Proven => 1.0,
            ConfidenceLabel::High => 0.95,
            ConfidenceLabel::Medium => 0.75,
            ConfidenceLabel::Insufficient => 0.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConfidenceLabel::Proven => "PROVEN",
            ConfidenceLabel::High => "HIGH",
            ConfidenceLabel::Medium => "MEDIUM",
            ConfidenceLabel::Insufficient => "INSUFFICIENT",
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Reported confidence of a chain together with its band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceAssessment {
    pub value: f64,
    pub label: ConfidenceLabel,
}

impl ConfidenceAssessment {
    pub const INSUFFICIENT: Self = Self {
        value: 0.0,
        label: ConfidenceLabel::Insufficient,
    };

    /// Bucket a raw mean confidence.
    pub fn from_mean(mean: f64) -> Self {
        if mean >= PROVEN_THRESHOLD {
            Self {
                value: ConfidenceLabel::Proven.canonical_value(),
                label: ConfidenceLabel::Proven,
            }
        } else if mean >= HIGH_THRESHOLD {
            Self {
                value: ConfidenceLabel::High.canonical_value(),
                label: ConfidenceLabel::High,
            }
        } else {
            Self {
                value: mean,
                label: ConfidenceLabel::Medium,
            }
        }
    }
}

/// Assess a chain: INSUFFICIENT when it concludes `INSUFFICIENT_EVIDENCE`
/// (or is empty), otherwise the bucketed mean of node weighted confidences.
pub fn assess(chain: &ProofChain) -> ConfidenceAssessment {
    if chain.is_empty() || chain.conclusion() == INSUFFICIENT_EVIDENCE {
        return ConfidenceAssessment::INSUFFICIENT;
    }
    let total: f64 = chain.nodes().iter().map(|n| n.weighted_confidence()).sum();
    ConfidenceAssessment::from_mean(total / chain.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{Evidence, EvidenceType};
    use crate::knowledge::{Fact, FactId};
    use crate::proof::LogicalStep;

    fn chain_with(confidences: &[f64]) -> ProofChain {
        let mut chain = ProofChain::new();
        for (i, c) in confidences.iter().enumerate() {
            chain.push_fact(&Fact {
                id: FactId::new(i as u64 + 1).unwrap(),
                statement: format!("fact {i}"),
                evidences: vec![Evidence::new("c", "s", EvidenceType::Rct, *c)],
                weight: 1.0,
            });
        }
        chain
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(
            ConfidenceAssessment::from_mean(0.97),
            ConfidenceAssessment { value: 1.0, label: ConfidenceLabel::Proven }
        );
        assert_eq!(
            ConfidenceAssessment::from_mean(0.95).label,
            ConfidenceLabel::Proven
        );
        assert_eq!(
            ConfidenceAssessment::from_mean(0.92),
            ConfidenceAssessment { value: 0.95, label: ConfidenceLabel::High }
        );
        assert_eq!(ConfidenceAssessment::from_mean(0.90).label, ConfidenceLabel::High);
        assert_eq!(
            ConfidenceAssessment::from_mean(0.6),
            ConfidenceAssessment { value: 0.6, label: ConfidenceLabel::Medium }
        );
    }

    #[test]
    fn assess_averages_nodes() {
        let a = assess(&chain_with(&[0.98, 0.96]));
        assert_eq!(a.label, ConfidenceLabel::Proven);
        assert_eq!(a.value, 1.0);

        let a = assess(&chain_with(&[0.5, 0.7]));
        assert_eq!(a.label, ConfidenceLabel::Medium);
        assert!((a.value - 0.6).abs() < 1e-12);
    }

    #[test]
    fn synthesized_nodes_pull_the_mean_down() {
        let mut chain = chain_with(&[1.0, 1.0]);
        chain.push_synthesized("escalate", LogicalStep::InferRisk);
        let a = assess(&chain);
        assert_eq!(a.label, ConfidenceLabel::Medium);
        assert!((a.value - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn insufficient_terminal_is_zero() {
        assert_eq!(assess(&ProofChain::new()), ConfidenceAssessment::INSUFFICIENT);

        let mut chain = ProofChain::new();
        chain.push_synthesized(INSUFFICIENT_EVIDENCE, LogicalStep::NoInference);
        assert_eq!(assess(&chain), ConfidenceAssessment::INSUFFICIENT);
    }

    #[test]
    fn labels_are_ordered_by_value() {
        assert!(ConfidenceLabel::Proven > ConfidenceLabel::High);
        assert!(ConfidenceLabel::High > ConfidenceLabel::Medium);
        assert!(ConfidenceLabel::Medium > ConfidenceLabel::Insufficient);
        assert_eq!(
            serde_json::to_string(&ConfidenceLabel::Proven).unwrap(),
            "\"PROVEN\""
        );
    }
}

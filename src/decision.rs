//! The terminal output record of the pipeline.
//!
//! Every request ends in exactly one [`Decision`] with one of three outcomes:
//!
//! | Outcome        | `refused` | `verification_code`      | `confidence`          |
//! |----------------|-----------|--------------------------|-----------------------|
//! | `Refused`      | true      | `"REJECTED"`             | 1.0 (refusal is certain) |
//! | `Insufficient` | false     | `"INSUFFICIENT"`         | 0.0                   |
//! | `Finalized`    | false     | `"Proof-" + 12 hex`      | band value            |
//!
//! An insufficient decision is not certified at any band, so it reports 0.0;
//! the confidence the chain actually reached is kept in
//! `uncertainty_analysis.confidence` and explained in `limitations`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

use crate::audit;
use crate::boundary::BoundaryViolation;
use crate::confidence::{ConfidenceAssessment, ConfidenceLabel};
use crate::crossval::CrossValidation;
use crate::pipeline::Stage;
use crate::proof::{ProofChain, ProofNode};

/// Verification code of a refusal.
pub const REJECTED_CODE: &str = "REJECTED";
/// Verification code of an insufficient-data result.
pub const INSUFFICIENT_CODE: &str = "INSUFFICIENT";

/// Which terminal state a decision reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    Refused,
    Insufficient,
    Finalized,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Refused => f.write_str("refused"),
            Outcome::Insufficient => f.write_str("insufficient"),
            Outcome::Finalized => f.write_str("finalized"),
        }
    }
}

/// What the gate saw for a chain that passed the boundary check.
#[derive(Debug, Clone)]
pub struct GateReport {
    pub assessment: ConfidenceAssessment,
    pub threshold: f64,
    pub cross_validation: CrossValidation,
    pub entailed: bool,
    /// Goal the entailment check was run against.
    pub goal: String,
}

impl GateReport {
    pub fn passes(&self) -> bool {
        self.assessment.value >= self.threshold && self.cross_validation.agree && self.entailed
    }
}

/// A gated yes/no decision with its audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub answer: bool,
    pub confidence: f64,
    pub confidence_label: ConfidenceLabel,
    pub proof_chain: Vec<ProofNode>,
    pub limitations: Vec<String>,
    pub verification_code: String,
    pub refused: bool,
    pub refuse_reason: Option<String>,
    pub reasoning: Option<String>,
    pub alternative_paths: Vec<String>,
    pub uncertainty_analysis: BTreeMap<String, Value>,
    pub falsifiability_test: BTreeMap<String, Value>,
}

impl Decision {
    /// Refusal for a boundary violation. Carries no proof chain.
    pub fn refused(violation: &BoundaryViolation) -> Self {
        let message = format!("refused [{}]: {}", violation.category, violation.reason);
        Self {
            answer: false,
            confidence: ConfidenceLabel::Proven.canonical_value(),
            confidence_label: ConfidenceLabel::Proven,
            proof_chain: Vec::new(),
            limitations: vec![violation.reason.clone()],
            verification_code: REJECTED_CODE.to_string(),
            refused: true,
            refuse_reason: Some(message.clone()),
            reasoning: Some(message),
            alternative_paths: Vec::new(),
            uncertainty_analysis: BTreeMap::from([
                ("category".to_string(), json!(violation.category.to_string())),
                ("severity".to_string(), json!(violation.severity)),
            ]),
            falsifiability_test: BTreeMap::new(),
        }
    }

    /// Insufficient-data result for a chain that failed at least one gate.
    pub fn insufficient(chain: ProofChain, report: &GateReport) -> Self {
        let terminal = chain.conclusion().to_string();
        let computed = report.assessment;

        let mut limitations = Vec::new();
        if computed.value < report.threshold {
            limitations.push(format!(
                "confidence {:.0}% is below the required threshold {:.0}%",
                computed.value * 100.0,
                report.threshold * 100.0
            ));
        } else {
            limitations.push(format!(
                "confidence {:.0}% meets the required threshold {:.0}% but the proof did not verify",
                computed.value * 100.0,
                report.threshold * 100.0
            ));
        }
        let mut alternative_paths = Vec::new();
        if !report.cross_validation.agree {
            limitations.push(format!(
                "cross-validation expected \"{}\" but the proof chain concludes \"{terminal}\"",
                report.cross_validation.alternative
            ));
            alternative_paths.push(report.cross_validation.alternative.clone());
        }
        if !report.entailed {
            limitations.push(format!(
                "conclusion \"{terminal}\" does not entail the goal \"{}\"",
                report.goal
            ));
        }
        limitations.push("additional evidence or a clarified question is required".to_string());

        let nodes = chain.into_nodes();
        let reasoning = if nodes.is_empty() {
            "insufficient data".to_string()
        } else {
            audit::reasoning(&nodes)
        };

        Self {
            answer: false,
            confidence: ConfidenceAssessment::INSUFFICIENT.value,
            confidence_label: ConfidenceAssessment::INSUFFICIENT.label,
            proof_chain: nodes,
            limitations,
            verification_code: INSUFFICIENT_CODE.to_string(),
            refused: false,
            refuse_reason: None,
            reasoning: Some(reasoning),
            alternative_paths,
            uncertainty_analysis: BTreeMap::from([
                ("status".to_string(), json!("insufficient")),
                ("confidence".to_string(), json!(computed.value)),
                ("label".to_string(), json!(computed.label.name())),
                ("threshold".to_string(), json!(report.threshold)),
                (
                    "agreement_alt".to_string(),
                    json!(report.cross_validation.alternative),
                ),
                ("entailed".to_string(), json!(report.entailed)),
            ]),
            falsifiability_test: BTreeMap::new(),
        }
    }

    /// Finalized decision for a chain that passed every gate.
    pub fn finalized(chain: ProofChain, report: &GateReport, answer: bool) -> Self {
        let nodes = chain.into_nodes();
        Self {
            answer,
            confidence: report.assessment.value,
            confidence_label: report.assessment.label,
            verification_code: audit::verification_code(&nodes),
            refused: false,
            refuse_reason: None,
            reasoning: Some(audit::reasoning(&nodes)),
            limitations: Vec::new(),
            alternative_paths: Vec::new(),
            uncertainty_analysis: BTreeMap::from([(
                "agreement_alt".to_string(),
                json!(report.cross_validation.alternative),
            )]),
            falsifiability_test: BTreeMap::from([(
                "hash".to_string(),
                json!(audit::falsifiability_hash(&nodes)),
            )]),
            proof_chain: nodes,
        }
    }

    /// Insufficient-data result for a request that ran out of time.
    pub fn timed_out(budget: Duration, stage: Stage) -> Self {
        let budget_ms = budget.as_secs_f64() * 1000.0;
        Self {
            answer: false,
            confidence: ConfidenceAssessment::INSUFFICIENT.value,
            confidence_label: ConfidenceAssessment::INSUFFICIENT.label,
            proof_chain: Vec::new(),
            limitations: vec![format!(
                "time budget of {budget:?} exceeded before the {stage} stage"
            )],
            verification_code: INSUFFICIENT_CODE.to_string(),
            refused: false,
            refuse_reason: None,
            reasoning: Some("time budget exceeded".to_string()),
            alternative_paths: Vec::new(),
            uncertainty_analysis: BTreeMap::from([
                ("status".to_string(), json!("timeout")),
                ("budget_ms".to_string(), json!(budget_ms)),
                ("stage".to_string(), json!(stage.to_string())),
            ]),
            falsifiability_test: BTreeMap::new(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.refused {
            Outcome::Refused
        } else if self.verification_code == INSUFFICIENT_CODE {
            Outcome::Insufficient
        } else {
            Outcome::Finalized
        }
    }
}

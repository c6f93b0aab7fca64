//! Independent cross-validation of a chain's conclusion.
//!
//! The validator never looks at retrieved facts. It predicts the terminal
//! statement from raw-text features alone: when every corroborating marker
//! co-occurs in the query it expects the escalation statement, otherwise
//! `INSUFFICIENT_EVIDENCE`. The pipeline only finalizes when the prediction
//! agrees with the chain.

use serde::Serialize;

use crate::config::EscalationRule;
use crate::entailment::normalize;
use crate::proof::{ProofNode, INSUFFICIENT_EVIDENCE};

/// Outcome of a cross-validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossValidation {
    pub agree: bool,
    /// The statement the validator expected.
    pub alternative: String,
}

#[derive(Debug, Clone, Default)]
pub struct CrossValidator {
    /// Lower-cased corroborating markers; empty means never corroborated.
    markers: Vec<String>,
    escalation_statement: Option<String>,
}

impl CrossValidator {
    pub fn new(rule: Option<&EscalationRule>) -> Self {
        match rule {
            Some(rule) => Self {
                markers: rule
                    .corroborating_markers
                    .iter()
                    .map(|m| m.to_lowercase())
                    .filter(|m| !m.is_empty())
                    .collect(),
                escalation_statement: Some(rule.statement.clone()),
            },
            None => Self::default(),
        }
    }

    /// Statement expected from the query text alone.
    pub fn expected(&self, query: &str) -> &str {
        let text = query.to_lowercase();
        match &self.escalation_statement {
            Some(statement)
                if !self.markers.is_empty()
                    && self.markers.iter().all(|m| text.contains(m.as_str())) =>
            {
                statement.as_str()
            }
            _ => INSUFFICIENT_EVIDENCE,
        }
    }

    pub fn validate(&self, query: &str, nodes: &[ProofNode]) -> CrossValidation {
        let alternative = self.expected(query).to_string();
        let terminal = nodes
            .last()
            .map(|n| n.statement.as_str())
            .unwrap_or(INSUFFICIENT_EVIDENCE);
        CrossValidation {
            agree: normalize(terminal) == normalize(&alternative),
            alternative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{LogicalStep, ProofChain};

    fn validator() -> CrossValidator {
        let rule = EscalationRule::new("perform_icu_transfer")
            .with_risk_marker("STEMI")
            .with_corroborating_marker("Chest pain")
            .with_corroborating_marker("blood pressure");
        CrossValidator::new(Some(&rule))
    }

    fn chain_ending(statement: &str, step: LogicalStep) -> ProofChain {
        let mut chain = ProofChain::new();
        chain.push_synthesized(statement, step);
        chain
    }

    #[test]
    fn co_occurring_markers_expect_escalation() {
        let v = validator();
        assert_eq!(
            v.expected("CHEST PAIN for an hour, blood pressure 170/110"),
            "perform_icu_transfer"
        );
        assert_eq!(v.expected("chest pain only"), INSUFFICIENT_EVIDENCE);
    }

    #[test]
    fn agreement_is_case_insensitive() {
        let chain = chain_ending("Perform_ICU_Transfer", LogicalStep::InferRisk);
        let result = validator().validate("chest pain and blood pressure", chain.nodes());
        assert!(result.agree);
        assert_eq!(result.alternative, "perform_icu_transfer");
    }

    #[test]
    fn insufficient_chain_agrees_with_uncorroborated_query() {
        let chain = chain_ending(INSUFFICIENT_EVIDENCE, LogicalStep::NoInference);
        assert!(validator().validate("a headache", chain.nodes()).agree);
    }

    #[test]
    fn disagreement_reports_expected_statement() {
        let chain = chain_ending("some fact", LogicalStep::InferRisk);
        let result = validator().validate("chest pain, blood pressure", chain.nodes());
        assert!(!result.agree);
        assert_eq!(result.alternative, "perform_icu_transfer");
    }

    #[test]
    fn no_rule_always_expects_insufficient() {
        let v = CrossValidator::new(None);
        assert_eq!(v.expected("chest pain and blood pressure"), INSUFFICIENT_EVIDENCE);

        let rule = EscalationRule::new("escalate");
        assert_eq!(CrossValidator::new(Some(&rule)).expected("anything"), INSUFFICIENT_EVIDENCE);
    }
}

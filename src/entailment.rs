//! Minimal syntactic entailment between a proof chain and a goal.
//!
//! The check only asks whether the chain's terminal statement *is* the goal
//! (or its literal `not ` negation) after normalization. It is an audit-shape
//! check and performs no semantic reasoning.

use unicode_normalization::UnicodeNormalization;

use crate::proof::ProofNode;

/// Prefix that marks a negated statement.
pub const NEGATION_PREFIX: &str = "not ";

/// NFC-normalize, trim and lower-case a statement for comparison.
pub fn normalize(text: &str) -> String {
    text.trim().nfc().collect::<String>().to_lowercase()
}

/// True if the terminal statement equals `goal` or `not {goal}`.
///
/// An empty chain entails nothing.
pub fn verify(nodes: &[ProofNode], goal: &str) -> bool {
    let Some(terminal) = nodes.last() else {
        return false;
    };
    let terminal = normalize(&terminal.statement);
    let goal = normalize(goal);
    terminal == goal || terminal == format!("{NEGATION_PREFIX}{goal}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{LogicalStep, ProofChain};

    fn chain_ending(statement: &str) -> ProofChain {
        let mut chain = ProofChain::new();
        chain.push_synthesized("earlier step", LogicalStep::InferRisk);
        chain.push_synthesized(statement, LogicalStep::InferRisk);
        chain
    }

    #[test]
    fn empty_chain_fails() {
        assert!(!verify(&[], "decision"));
    }

    #[test]
    fn terminal_equal_to_goal_passes() {
        let chain = chain_ending("  Perform_ICU_Transfer ");
        assert!(verify(chain.nodes(), "perform_icu_transfer"));
    }

    #[test]
    fn negated_terminal_passes() {
        let chain = chain_ending("NOT administer thrombolysis");
        assert!(verify(chain.nodes(), "administer thrombolysis"));
    }

    #[test]
    fn only_terminal_statement_counts() {
        let chain = chain_ending("something else");
        assert!(!verify(chain.nodes(), "earlier step"));
        assert!(!verify(chain.nodes(), "decision"));
    }

    #[test]
    fn normalization_unifies_composed_and_decomposed_forms() {
        // "é" precomposed vs "e" + combining acute accent.
        assert_eq!(normalize("Caf\u{e9}"), normalize("cafe\u{301}"));
    }
}

//! Rich diagnostic error types for proofgate.
//!
//! Errors only arise while *building* a pipeline (compiling patterns, seeding
//! the knowledge base, loading domain packs). Once built, the pipeline never
//! fails: every request ends in exactly one [`Decision`](crate::decision::Decision).

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::DomainError;

/// Top-level error type for proofgate.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum ProofgateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),
}

// ---------------------------------------------------------------------------
// Knowledge base errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KnowledgeError {
    #[error("fact ID allocator exhausted")]
    #[diagnostic(
        code(proofgate::knowledge::exhausted),
        help(
            "The 64-bit fact ID space has been exhausted. This should never happen \
             in practice; rebuild the knowledge base."
        )
    )]
    AllocatorExhausted,

    #[error("fact weight {weight} is outside [0, 1]")]
    #[diagnostic(
        code(proofgate::knowledge::weight),
        help("Fact weights are probabilities. Supply a finite value between 0.0 and 1.0.")
    )]
    WeightOutOfRange { weight: f64 },

    #[error("evidence from \"{source_name}\" has confidence {confidence} outside [0, 1]")]
    #[diagnostic(
        code(proofgate::knowledge::evidence_confidence),
        help(
            "Evidence confidence feeds the weighted confidence of every proof node. \
             Supply a finite value between 0.0 and 1.0."
        )
    )]
    EvidenceConfidenceOutOfRange { source_name: String, confidence: f64 },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid {role} pattern \"{pattern}\": {message}")]
    #[diagnostic(
        code(proofgate::config::pattern),
        help(
            "Patterns use the `regex` crate syntax (no look-around or backreferences). \
             Harm patterns and goal triggers are matched case-insensitively."
        )
    )]
    InvalidPattern {
        role: &'static str,
        pattern: String,
        message: String,
    },

    #[error("confidence threshold {threshold} is outside [0, 1]")]
    #[diagnostic(
        code(proofgate::config::threshold),
        help("`min_confidence_threshold` defaults to 0.95. Supply a value between 0.0 and 1.0.")
    )]
    ThresholdOutOfRange { threshold: f64 },

    #[error("escalation rule has an empty statement")]
    #[diagnostic(
        code(proofgate::config::escalation),
        help(
            "The escalation statement is the conclusion appended when a high-risk marker \
             is retrieved. Give it a non-empty text such as \"perform_icu_transfer\"."
        )
    )]
    EmptyEscalationStatement,

    #[error("restricted source marker is empty")]
    #[diagnostic(
        code(proofgate::config::restricted_marker),
        help("An empty marker would match every source. Omit the marker to disable the scan.")
    )]
    EmptyRestrictedMarker,
}

/// Convenience result type for proofgate operations.
pub type ProofgateResult<T> = std::result::Result<T, ProofgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_error_converts_to_top_level() {
        let err: ProofgateError = KnowledgeError::WeightOutOfRange { weight: 1.5 }.into();
        assert!(matches!(
            err,
            ProofgateError::Knowledge(KnowledgeError::WeightOutOfRange { .. })
        ));
    }

    #[test]
    fn config_error_display_names_pattern() {
        let err = ConfigError::InvalidPattern {
            role: "harm",
            pattern: "(unclosed".into(),
            message: "unclosed group".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("harm"));
        assert!(msg.contains("(unclosed"));
    }

    #[test]
    fn diagnostic_codes_are_namespaced() {
        let err = ConfigError::ThresholdOutOfRange { threshold: 2.0 };
        let code = err.code().map(|c| c.to_string()).unwrap_or_default();
        assert_eq!(code, "proofgate::config::threshold");
    }
}

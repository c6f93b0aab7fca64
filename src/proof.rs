//! Proof chains: the ordered audit trail from retrieved evidence to a
//! terminal statement.
//!
//! A chain owns its nodes exclusively. Node IDs are allocated per chain
//! starting at 1, so rebuilding a chain from the same facts yields the same
//! IDs (and therefore the same verification code).

use std::num::NonZeroU64;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::evidence::Evidence;
use crate::knowledge::{Fact, FactId};

/// Terminal statement of a chain that found nothing to reason from.
pub const INSUFFICIENT_EVIDENCE: &str = "INSUFFICIENT_EVIDENCE";

/// `verifiable_source` of nodes synthesized by an inference rule.
pub const INFERENCE_SOURCE: &str = "inference";

/// Identifier of a node within its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProofNodeId(NonZeroU64);

impl ProofNodeId {
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ProofNodeId)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ProofNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

impl Serialize for ProofNodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How a proof node was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalStep {
    /// Retrieved directly from the knowledge base.
    KbMatch(FactId),
    /// Synthesized by the high-risk escalation rule.
    InferRisk,
    /// Placeholder conclusion when nothing could be retrieved or inferred.
    NoInference,
}

impl std::fmt::Display for LogicalStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalStep::KbMatch(id) => write!(f, "kb_match:{id}"),
            LogicalStep::InferRisk => f.write_str("infer_risk"),
            LogicalStep::NoInference => f.write_str("no_inference"),
        }
    }
}

impl Serialize for LogicalStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One step of a proof chain.
#[derive(Debug, Clone, Serialize)]
pub struct ProofNode {
    pub id: ProofNodeId,
    pub statement: String,
    pub evidence: Vec<Evidence>,
    pub logical_step: LogicalStep,
    /// Comma-joined evidence sources, `"inference"` for synthesized nodes.
    pub verifiable_source: Option<String>,
    pub contradictions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ProofNode {
    /// Mean confidence of the node's evidence, 0 when it has none.
    pub fn weighted_confidence(&self) -> f64 {
        if self.evidence.is_empty() {
            return 0.0;
        }
        let total: f64 = self.evidence.iter().map(|e| e.confidence).sum();
        total / self.evidence.len() as f64
    }

    /// Whether this node was produced by an inference rule rather than retrieval.
    pub fn is_synthesized(&self) -> bool {
        !matches!(self.logical_step, LogicalStep::KbMatch(_))
    }
}

/// Ordered, exclusively owned sequence of proof nodes.
#[derive(Debug, Clone, Default)]
pub struct ProofChain {
    nodes: Vec<ProofNode>,
}

impl ProofChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> ProofNodeId {
        // len + 1 is never zero.
        ProofNodeId(NonZeroU64::MIN.saturating_add(self.nodes.len() as u64))
    }

    /// Append a node for a retrieved fact, copying its evidence.
    pub fn push_fact(&mut self, fact: &Fact) -> ProofNodeId {
        let sources: Vec<&str> = fact
            .evidences
            .iter()
            .map(|e| e.source.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        let verifiable_source = (!sources.is_empty()).then(|| sources.join(","));

        self.push(ProofNode {
            id: self.next_id(),
            statement: fact.statement.clone(),
            evidence: fact.evidences.clone(),
            logical_step: LogicalStep::KbMatch(fact.id),
            verifiable_source,
            contradictions: Vec::new(),
            created_at: Utc::now(),
        })
    }

    /// Append an evidence-free node produced by an inference rule.
    pub fn push_synthesized(
        &mut self,
        statement: impl Into<String>,
        step: LogicalStep,
    ) -> ProofNodeId {
        self.push(ProofNode {
            id: self.next_id(),
            statement: statement.into(),
            evidence: Vec::new(),
            logical_step: step,
            verifiable_source: Some(INFERENCE_SOURCE.to_string()),
            contradictions: Vec::new(),
            created_at: Utc::now(),
        })
    }

    fn push(&mut self, node: ProofNode) -> ProofNodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    /// The last node, whose statement is the chain's conclusion.
    pub fn terminal(&self) -> Option<&ProofNode> {
        self.nodes.last()
    }

    /// Terminal statement, or [`INSUFFICIENT_EVIDENCE`] for an empty chain.
    pub fn conclusion(&self) -> &str {
        self.terminal()
            .map(|n| n.statement.as_str())
            .unwrap_or(INSUFFICIENT_EVIDENCE)
    }

    pub fn nodes(&self) -> &[ProofNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn into_nodes(self) -> Vec<ProofNode> {
        self.nodes
    }
}

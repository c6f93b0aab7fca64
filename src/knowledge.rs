//! Knowledge base: an append-only collection of evidence-backed facts.
//!
//! Facts are identified by a [`FactId`] handed out by a [`FactIdAllocator`].
//! Lookup is deliberately simple: the query text is split into lower-cased
//! word tokens and every fact whose statement contains any token is returned,
//! in insertion order.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{KnowledgeError, ProofgateResult};
use crate::evidence::{is_unit_interval, Evidence};

/// Unique, niche-optimized identifier for a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FactId(NonZeroU64);

impl FactId {
    /// Create a `FactId` from a raw `u64`. Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(FactId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for FactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fact:{}", self.0)
    }
}

/// Thread-safe fact ID allocator.
///
/// Produces monotonically increasing IDs starting from 1, so two knowledge
/// bases seeded in the same order assign the same IDs.
#[derive(Debug)]
pub struct FactIdAllocator {
    next: AtomicU64,
}

impl FactIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next fact ID.
    pub fn next_id(&self) -> Result<FactId, KnowledgeError> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        FactId::new(raw).ok_or(KnowledgeError::AllocatorExhausted)
    }

    /// Return the next ID that *would* be allocated, without consuming it.
    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for FactIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A knowledge-base entry: a statement plus its supporting evidence.
#[derive(Debug, Clone, Serialize)]
pub struct Fact {
    pub id: FactId,
    pub statement: String,
    pub evidences: Vec<Evidence>,
    /// Prior weight of the fact in `[0, 1]`.
    pub weight: f64,
}

/// Append-only fact store.
///
/// Mutation needs `&mut self`; the pipeline keeps the store behind an `Arc`,
/// which makes it read-only for the lifetime of the pipeline.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    facts: Vec<Fact>,
    allocator: FactIdAllocator,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fact. Duplicate statements are allowed.
    pub fn add_fact(
        &mut self,
        statement: impl Into<String>,
        evidences: Vec<Evidence>,
        weight: f64,
    ) -> ProofgateResult<FactId> {
        if !is_unit_interval(weight) {
            return Err(KnowledgeError::WeightOutOfRange { weight }.into());
        }
        for evidence in &evidences {
            evidence.validate()?;
        }

        let id = self.allocator.next_id()?;
        self.facts.push(Fact {
            id,
            statement: statement.into(),
            evidences,
            weight,
        });
        Ok(id)
    }

    /// Every fact whose statement contains at least one query token
    /// (case-insensitive), in insertion order.
    pub fn query(&self, text: &str) -> Vec<&Fact> {
        let tokens = query_tokens(text);
        if tokens.is_empty() {
            return Vec::new();
        }
        self.facts
            .iter()
            .filter(|fact| {
                let statement = fact.statement.to_lowercase();
                tokens.iter().any(|tok| statement.contains(tok.as_str()))
            })
            .collect()
    }

    /// Look up a fact by ID.
    pub fn get(&self, id: FactId) -> Option<&Fact> {
        // IDs are dense and start at 1, so the index is a direct hit unless
        // the ID came from another knowledge base.
        let idx = usize::try_from(id.get() - 1).ok()?;
        self.facts.get(idx).filter(|f| f.id == id)
    }

    /// All facts in insertion order.
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Split text on non-word characters and lower-case the pieces.
///
/// Word characters are Unicode alphanumerics and `_`.
pub fn query_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|tok| !tok.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceType;

    fn ev(confidence: f64) -> Evidence {
        Evidence::new("summary", "Journal 2024", EvidenceType::PeerReviewed, confidence)
    }

    #[test]
    fn fact_id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<FactId>>(),
            std::mem::size_of::<FactId>()
        );
        assert!(FactId::new(0).is_none());
        assert_eq!(FactId::new(7).unwrap().to_string(), "fact:7");
    }

    #[test]
    fn allocator_produces_sequential_ids() {
        let alloc = FactIdAllocator::new();
        assert_eq!(alloc.next_id().unwrap().get(), 1);
        assert_eq!(alloc.next_id().unwrap().get(), 2);
        assert_eq!(alloc.peek_next(), 3);
    }

    #[test]
    fn tokens_split_on_non_word_characters() {
        assert_eq!(
            query_tokens("Chest-pain, BP 160/100?"),
            vec!["chest", "pain", "bp", "160", "100"]
        );
        assert!(query_tokens("  ?! ").is_empty());
        assert_eq!(query_tokens("đau_ngực"), vec!["đau_ngực"]);
    }

    #[test]
    fn query_matches_any_token_in_insertion_order() {
        let mut kb = KnowledgeBase::new();
        let a = kb.add_fact("Aspirin reduces clot formation", vec![ev(0.9)], 0.9).unwrap();
        kb.add_fact("Statins lower cholesterol", vec![ev(0.8)], 0.8).unwrap();
        let c = kb.add_fact("Clot risk rises after surgery", vec![ev(0.7)], 0.7).unwrap();

        let hits: Vec<FactId> = kb.query("CLOT").iter().map(|f| f.id).collect();
        assert_eq!(hits, vec![a, c]);

        let hits = kb.query("aspirin or statins");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn query_matches_token_as_substring() {
        let mut kb = KnowledgeBase::new();
        kb.add_fact("Hypertension stage 2", vec![], 1.0).unwrap();
        assert_eq!(kb.query("tension").len(), 1);
        assert!(kb.query("zzz").is_empty());
        assert!(kb.query("").is_empty());
    }

    #[test]
    fn duplicates_are_permitted() {
        let mut kb = KnowledgeBase::new();
        let a = kb.add_fact("same", vec![], 0.5).unwrap();
        let b = kb.add_fact("same", vec![], 0.5).unwrap();
        assert_ne!(a, b);
        assert_eq!(kb.query("same").len(), 2);
    }

    #[test]
    fn add_fact_rejects_invalid_weight_and_evidence() {
        let mut kb = KnowledgeBase::new();
        assert!(kb.add_fact("x", vec![], 1.2).is_err());
        assert!(kb.add_fact("x", vec![ev(-0.1)], 0.5).is_err());
        assert!(kb.is_empty());
    }

    #[test]
    fn get_resolves_ids() {
        let mut kb = KnowledgeBase::new();
        let a = kb.add_fact("alpha", vec![], 0.5).unwrap();
        let b = kb.add_fact("beta", vec![], 0.5).unwrap();
        assert_eq!(kb.get(b).unwrap().statement, "beta");
        assert_eq!(kb.get(a).unwrap().statement, "alpha");
        assert!(kb.get(FactId::new(99).unwrap()).is_none());
        assert_eq!(kb.len(), 2);
    }
}

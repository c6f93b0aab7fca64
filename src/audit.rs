//! Audit fingerprints and the human-readable rendering of a proof chain.
//!
//! Two hashes are computed over a chain and they are intentionally distinct:
//!
//! - [`verification_code`] hashes a sorted-key canonical JSON rendering of
//!   every node's id, statement and `(source, confidence)` evidence pairs.
//!   It is the audit fingerprint of a finalized decision.
//! - [`falsifiability_hash`] hashes the raw concatenation of statements and
//!   evidence sources in insertion order. It only marks the falsifiability
//!   record and is never compared against the verification code.

use std::collections::BTreeSet;
use std::io;

use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::proof::ProofNode;

/// Prefix of every content-derived verification code.
pub const VERIFICATION_PREFIX: &str = "Proof-";

const VERIFICATION_HEX_LEN: usize = 12;
const FALSIFIABILITY_HEX_LEN: usize = 16;

/// `Proof-` followed by the first 12 hex digits of the SHA-256 of the
/// chain's canonical serialization.
pub fn verification_code(nodes: &[ProofNode]) -> String {
    let digest = hex::encode(Sha256::digest(canonical_chain(nodes).as_bytes()));
    format!("{VERIFICATION_PREFIX}{}", &digest[..VERIFICATION_HEX_LEN])
}

/// First 16 hex digits of the SHA-256 of every statement followed by its
/// evidence sources, in chain order.
pub fn falsifiability_hash(nodes: &[ProofNode]) -> String {
    let mut hasher = Sha256::new();
    for node in nodes {
        hasher.update(node.statement.as_bytes());
        for evidence in &node.evidence {
            hasher.update(evidence.source.as_bytes());
        }
    }
    let digest = hex::encode(hasher.finalize());
    digest[..FALSIFIABILITY_HEX_LEN].to_string()
}

/// Canonical serialization hashed by [`verification_code`].
///
/// A JSON array with one object per node, keys sorted (`evid`, `id`, `stmt`),
/// `", "` and `": "` separators, non-ASCII text left unescaped.
pub fn canonical_chain(nodes: &[ProofNode]) -> String {
    let value = Value::Array(
        nodes
            .iter()
            .map(|node| {
                let evid: Vec<Value> = node
                    .evidence
                    .iter()
                    .map(|e| json!([e.source, e.confidence]))
                    .collect();
                // serde_json's default map is ordered by key.
                json!({
                    "id": node.id.to_string(),
                    "stmt": node.statement,
                    "evid": evid,
                })
            })
            .collect(),
    );

    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    // Writing a `Value` into a Vec cannot fail.
    if value.serialize(&mut ser).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

/// Compact JSON with a space after every `,` and `:`.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// One numbered line per node: statement, weighted confidence as a
/// percentage, the sorted set of evidence types and a contradiction count.
pub fn reasoning(nodes: &[ProofNode]) -> String {
    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let mut line = format!(
                "{}. {} (confidence: {:.0}%)",
                i + 1,
                node.statement,
                node.weighted_confidence() * 100.0
            );
            if !node.evidence.is_empty() {
                let types: BTreeSet<&str> =
                    node.evidence.iter().map(|e| e.evidence_type.name()).collect();
                let types: Vec<&str> = types.into_iter().collect();
                line.push_str(&format!(" [{}]", types.join(", ")));
            }
            if !node.contradictions.is_empty() {
                line.push_str(&format!(" [contradictions: {}]", node.contradictions.len()));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{Evidence, EvidenceType};
    use crate::knowledge::{Fact, FactId};
    use crate::proof::{LogicalStep, ProofChain};

    fn chain() -> ProofChain {
        let mut chain = ProofChain::new();
        chain.push_fact(&Fact {
            id: FactId::new(1).unwrap(),
            statement: "Huyết áp ≥ 160/100".into(),
            evidences: vec![
                Evidence::new("bp", "ESC/ESH 2023", EvidenceType::ClinicalGuideline, 1.0),
                Evidence::new("bp", "Cohort 2020", EvidenceType::Observational, 0.9),
            ],
            weight: 1.0,
        });
        chain.push_synthesized("perform_icu_transfer", LogicalStep::InferRisk);
        chain
    }

    #[test]
    fn canonical_chain_sorts_keys_and_spaces_separators() {
        let text = canonical_chain(chain().nodes());
        assert_eq!(
            text,
            "[{\"evid\": [[\"ESC/ESH 2023\", 1.0], [\"Cohort 2020\", 0.9]], \
             \"id\": \"node:1\", \"stmt\": \"Huyết áp ≥ 160/100\"}, \
             {\"evid\": [], \"id\": \"node:2\", \"stmt\": \"perform_icu_transfer\"}]"
        );
    }

    #[test]
    fn verification_code_has_prefix_and_twelve_hex_digits() {
        let code = verification_code(chain().nodes());
        let hex = code.strip_prefix(VERIFICATION_PREFIX).unwrap();
        assert_eq!(hex.len(), 12);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn verification_code_depends_only_on_content() {
        // Rebuilt chains differ in created_at but not in content.
        assert_eq!(verification_code(chain().nodes()), verification_code(chain().nodes()));

        let mut other = chain();
        other.push_synthesized("extra", LogicalStep::NoInference);
        assert_ne!(verification_code(chain().nodes()), verification_code(other.nodes()));
    }

    #[test]
    fn falsifiability_hash_matches_raw_concatenation() {
        let expected = hex::encode(Sha256::digest(
            "Huyết áp ≥ 160/100ESC/ESH 2023Cohort 2020perform_icu_transfer".as_bytes(),
        ));
        assert_eq!(falsifiability_hash(chain().nodes()), expected[..16]);
    }

    #[test]
    fn the_two_hashes_are_independent() {
        let nodes = chain();
        let code = verification_code(nodes.nodes());
        let hash = falsifiability_hash(nodes.nodes());
        assert_ne!(&code[VERIFICATION_PREFIX.len()..], &hash[..12]);
    }

    #[test]
    fn reasoning_numbers_nodes_and_sorts_types() {
        let text = reasoning(chain().nodes());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "1. Huyết áp ≥ 160/100 (confidence: 95%) [CLINICAL_GUIDELINE, OBSERVATIONAL]"
        );
        assert_eq!(lines[1], "2. perform_icu_transfer (confidence: 0%)");
    }

    #[test]
    fn reasoning_annotates_contradictions() {
        let mut nodes = chain().into_nodes();
        nodes[1].contradictions.push("conflicting guideline".into());
        let text = reasoning(&nodes);
        assert!(text.ends_with("[contradictions: 1]"));
    }
}

//! Domain packs: a pipeline configuration plus its seed facts.
//!
//! A domain pack is a TOML document that specializes the generic pipeline.
//! Two packs are bundled into the binary: `medical` and `generic`. Further
//! packs are discovered from a directory, where each `*.toml` file or
//! `<subdir>/domain.toml` is one pack; discovered packs override bundled
//! ones with the same id.
//!
//! ```toml
//! [domain]
//! id = "cardiology"
//! name = "Cardiology triage"
//! version = "0.1.0"
//! description = "Chest pain escalation"
//!
//! [pipeline]
//! min_confidence_threshold = 0.95
//!
//! [[facts]]
//! statement = "Chest pain lasting over 20 minutes suggests ACS"
//! weight = 0.98
//!
//! [[facts.evidence]]
//! content = "..."
//! source = "AHA/ACC 2023"
//! type = "CLINICAL_GUIDELINE"
//! confidence = 0.98
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::error::ProofgateResult;
use crate::evidence::Evidence;
use crate::knowledge::KnowledgeBase;
use crate::pipeline::DecisionPipeline;

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum DomainError {
    #[error("domain pack not found: \"{id}\"")]
    #[diagnostic(
        code(proofgate::domain::not_found),
        help("List available domains with `proofgate domains`, or pass a path to a domain TOML file.")
    )]
    NotFound { id: String },

    #[error("failed to parse domain pack \"{id}\": {message}")]
    #[diagnostic(
        code(proofgate::domain::parse),
        help("A domain pack needs a [domain] table with id, name, version and description.")
    )]
    Parse { id: String, message: String },

    #[error("failed to read domain file: {path}")]
    #[diagnostic(code(proofgate::domain::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed fact #{index} in domain \"{id}\": {message}")]
    #[diagnostic(
        code(proofgate::domain::seed),
        help("Fact weights and evidence confidences must lie in [0, 1].")
    )]
    Seed {
        id: String,
        index: usize,
        message: String,
    },
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;

// ── Data model ──────────────────────────────────────────────────────────

/// A parsed domain pack.
#[derive(Debug, Clone)]
pub struct DomainPack {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub config: PipelineConfig,
    pub facts: Vec<SeedFact>,
    pub source: DomainSource,
}

/// Where a domain pack came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainSource {
    /// Bundled into the binary via `include_str!`.
    Bundled,
    /// Loaded from a file on disk.
    External(PathBuf),
}

impl std::fmt::Display for DomainSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainSource::Bundled => f.write_str("bundled"),
            DomainSource::External(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A fact seeded into the knowledge base when the pack is compiled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFact {
    pub statement: String,
    pub weight: f64,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

/// Short description of a pack, as listed by the CLI and the server.
#[derive(Debug, Clone, Serialize)]
pub struct DomainSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub source: String,
    pub facts: usize,
    pub min_confidence_threshold: f64,
    pub escalation: Option<String>,
}

impl DomainPack {
    /// Parse a pack from TOML text.
    pub fn from_toml(text: &str, source: DomainSource) -> DomainResult<Self> {
        let parsed: DomainToml = toml::from_str(text).map_err(|e| DomainError::Parse {
            id: match &source {
                DomainSource::Bundled => "(bundled)".into(),
                DomainSource::External(path) => path.display().to_string(),
            },
            message: e.to_string(),
        })?;
        Ok(Self {
            id: parsed.domain.id,
            name: parsed.domain.name,
            version: parsed.domain.version,
            description: parsed.domain.description,
            config: parsed.pipeline,
            facts: parsed.facts,
            source,
        })
    }

    /// Read and parse a pack file.
    pub fn load(path: &Path) -> DomainResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DomainError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text, DomainSource::External(path.to_path_buf()))
    }

    /// Seed a fresh knowledge base with the pack's facts.
    pub fn knowledge_base(&self) -> DomainResult<KnowledgeBase> {
        let mut kb = KnowledgeBase::new();
        for (index, fact) in self.facts.iter().enumerate() {
            kb.add_fact(fact.statement.clone(), fact.evidence.clone(), fact.weight)
                .map_err(|e| DomainError::Seed {
                    id: self.id.clone(),
                    index,
                    message: e.to_string(),
                })?;
        }
        Ok(kb)
    }

    /// Compile the pack into a ready pipeline.
    pub fn compile(&self) -> ProofgateResult<DecisionPipeline> {
        self.compile_with(self.config.clone())
    }

    /// Compile with a replacement configuration, keeping the seed facts.
    pub fn compile_with(&self, config: PipelineConfig) -> ProofgateResult<DecisionPipeline> {
        let kb = self.knowledge_base()?;
        tracing::debug!(domain = %self.id, facts = kb.len(), "compiling domain pack");
        DecisionPipeline::new(config, kb)
    }

    pub fn summary(&self) -> DomainSummary {
        DomainSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            source: self.source.to_string(),
            facts: self.facts.len(),
            min_confidence_threshold: self.config.min_confidence_threshold,
            escalation: self.config.escalation.as_ref().map(|r| r.statement.clone()),
        }
    }
}

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DomainToml {
    domain: DomainMeta,
    #[serde(default)]
    pipeline: PipelineConfig,
    #[serde(default)]
    facts: Vec<SeedFact>,
}

#[derive(Debug, Deserialize)]
struct DomainMeta {
    id: String,
    name: String,
    version: String,
    description: String,
}

// ── Bundled packs ───────────────────────────────────────────────────────

const MEDICAL_TOML: &str = include_str!("../../data/domains/medical/domain.toml");
const GENERIC_TOML: &str = include_str!("../../data/domains/generic/domain.toml");

/// Id of the pack used when none is named.
pub const DEFAULT_DOMAIN: &str = "medical";

fn bundled_packs() -> Vec<DomainPack> {
    [(MEDICAL_TOML, "medical"), (GENERIC_TOML, "generic")]
        .iter()
        .filter_map(
            |(toml, id)| match DomainPack::from_toml(toml, DomainSource::Bundled) {
                Ok(pack) => Some(pack),
                Err(e) => {
                    tracing::warn!(domain = id, "failed to parse bundled domain: {e}");
                    None
                }
            },
        )
        .collect()
}

// ── Registry ────────────────────────────────────────────────────────────

/// Registry of available domain packs (bundled + discovered from disk).
pub struct DomainRegistry {
    packs: HashMap<String, DomainPack>,
}

impl DomainRegistry {
    /// Create a registry with only bundled packs.
    pub fn bundled() -> Self {
        let packs = bundled_packs()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { packs }
    }

    /// Discover packs from a directory in addition to the bundled ones.
    ///
    /// Unreadable or malformed files are logged and skipped.
    pub fn discover(domains_dir: &Path) -> Self {
        let mut registry = Self::bundled();

        let Ok(entries) = std::fs::read_dir(domains_dir) else {
            tracing::debug!(dir = %domains_dir.display(), "no domains directory");
            return registry;
        };

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter_map(|path| {
                if path.is_dir() {
                    let nested = path.join("domain.toml");
                    nested.is_file().then_some(nested)
                } else if path.extension().is_some_and(|ext| ext == "toml") {
                    Some(path)
                } else {
                    None
                }
            })
            .collect();
        files.sort();

        for file in files {
            match DomainPack::load(&file) {
                Ok(pack) => {
                    tracing::debug!(
                        domain = %pack.id,
                        path = %file.display(),
                        "discovered domain pack"
                    );
                    registry.packs.insert(pack.id.clone(), pack);
                }
                Err(e) => {
                    tracing::warn!(path = %file.display(), "skipping domain pack: {e}");
                }
            }
        }

        registry
    }

    /// List all available packs, sorted by id.
    pub fn list(&self) -> Vec<&DomainPack> {
        let mut packs: Vec<&DomainPack> = self.packs.values().collect();
        packs.sort_by(|a, b| a.id.cmp(&b.id));
        packs
    }

    /// Get a pack by id.
    pub fn get(&self, id: &str) -> DomainResult<&DomainPack> {
        self.packs
            .get(id)
            .ok_or_else(|| DomainError::NotFound { id: id.to_string() })
    }

    /// Resolve a pack by id, or load it from `id_or_path` when that names
    /// an existing file.
    pub fn resolve(&self, id_or_path: &str) -> DomainResult<DomainPack> {
        if let Some(pack) = self.packs.get(id_or_path) {
            return Ok(pack.clone());
        }
        let path = Path::new(id_or_path);
        if path.is_file() {
            return DomainPack::load(path);
        }
        Err(DomainError::NotFound {
            id: id_or_path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Outcome;
    use crate::evidence::EvidenceType;

    #[test]
    fn bundled_packs_parse() {
        let packs = bundled_packs();
        assert_eq!(packs.len(), 2);
        assert!(packs.iter().any(|p| p.id == "medical"));
        assert!(packs.iter().any(|p| p.id == "generic"));
    }

    #[test]
    fn medical_pack_contents() {
        let registry = DomainRegistry::bundled();
        let medical = registry.get("medical").unwrap();
        assert_eq!(medical.facts.len(), 3);
        assert_eq!(medical.config.min_confidence_threshold, 0.95);

        let rule = medical.config.escalation.as_ref().unwrap();
        assert_eq!(rule.statement, "perform_icu_transfer");
        assert!(rule.risk_markers.contains(&"STEMI".to_string()));

        let first = &medical.facts[0].evidence[0];
        assert_eq!(first.source, "AHA/ACC 2023");
        assert_eq!(first.evidence_type, EvidenceType::ClinicalGuideline);
        assert_eq!(first.citations, 1247);
    }

    #[test]
    fn bundled_packs_compile() {
        for pack in DomainRegistry::bundled().list() {
            let pipeline = pack.compile().unwrap();
            assert_eq!(pipeline.knowledge().len(), pack.facts.len());
        }
    }

    #[test]
    fn generic_pack_has_no_escalation() {
        let registry = DomainRegistry::bundled();
        let generic = registry.get("generic").unwrap();
        assert!(generic.config.escalation.is_none());
        let d = generic.compile().unwrap().decide("anything at all");
        assert_eq!(d.outcome(), Outcome::Insufficient);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let err = DomainRegistry::bundled().resolve("astrology").unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn missing_meta_is_parse_error() {
        let err = DomainPack::from_toml("[pipeline]\n", DomainSource::Bundled).unwrap_err();
        assert!(matches!(err, DomainError::Parse { .. }));
    }

    #[test]
    fn invalid_seed_fact_is_reported_with_index() {
        let pack = DomainPack::from_toml(
            r#"
            [domain]
            id = "bad"
            name = "Bad"
            version = "0"
            description = "weights out of range"

            [[facts]]
            statement = "fine"
            weight = 0.5

            [[facts]]
            statement = "too heavy"
            weight = 1.5
            "#,
            DomainSource::Bundled,
        )
        .unwrap();
        let err = pack.knowledge_base().unwrap_err();
        assert!(matches!(err, DomainError::Seed { index: 1, .. }));
    }

    #[test]
    fn summary_reports_escalation() {
        let registry = DomainRegistry::bundled();
        let summary = registry.get("medical").unwrap().summary();
        assert_eq!(summary.escalation.as_deref(), Some("perform_icu_transfer"));
        assert_eq!(summary.source, "bundled");
        assert_eq!(summary.facts, 3);
    }
}

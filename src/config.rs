//! Pipeline configuration: every domain-specific knob as explicit data.
//!
//! A [`PipelineConfig`] holds pattern *sources*, not compiled regexes; it is
//! plain data that can be built in code, deserialized from a domain pack, and
//! cloned freely. [`DecisionPipeline::new`](crate::pipeline::DecisionPipeline::new)
//! validates it and compiles the patterns.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::evidence::is_unit_interval;

/// Default minimum confidence for a finalized decision.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.95;

/// Default marker that flags an evidence source as restricted.
pub const DEFAULT_RESTRICTED_MARKER: &str = "private";

/// A labelled harm-intent pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmPatternSpec {
    /// Short category name reported on refusal (`weapon-making`, ...).
    pub label: String,
    /// Case-insensitive regular expression.
    pub pattern: String,
}

impl HarmPatternSpec {
    pub fn new(label: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
        }
    }
}

/// Maps a trigger phrase to a goal tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalTriggerSpec {
    /// Case-insensitive regular expression.
    pub pattern: String,
    /// Goal tag assigned when the pattern matches.
    pub goal: String,
    /// When set, entailment is checked against the escalation statement
    /// instead of the goal tag.
    #[serde(default)]
    pub escalates: bool,
}

impl GoalTriggerSpec {
    pub fn new(pattern: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            goal: goal.into(),
            escalates: false,
        }
    }

    pub fn escalating(mut self) -> Self {
        self.escalates = true;
        self
    }
}

/// The fixed high-risk inference rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRule {
    /// Case-sensitive substrings of a retrieved statement that trigger the rule.
    pub risk_markers: Vec<String>,
    /// Statement of the synthesized node (e.g. `perform_icu_transfer`).
    pub statement: String,
    /// Answer given when the escalation statement concludes the chain.
    #[serde(default = "default_answer")]
    pub answer: bool,
    /// Lower-case phrases that must all appear in the query for
    /// cross-validation to expect the escalation statement.
    #[serde(default)]
    pub corroborating_markers: Vec<String>,
}

fn default_answer() -> bool {
    true
}

impl EscalationRule {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            risk_markers: Vec::new(),
            statement: statement.into(),
            answer: true,
            corroborating_markers: Vec::new(),
        }
    }

    pub fn with_risk_marker(mut self, marker: impl Into<String>) -> Self {
        self.risk_markers.push(marker.into());
        self
    }

    pub fn with_corroborating_marker(mut self, marker: impl Into<String>) -> Self {
        self.corroborating_markers.push(marker.into());
        self
    }

    pub fn with_answer(mut self, answer: bool) -> Self {
        self.answer = answer;
        self
    }

    /// Whether any risk marker occurs in `statement`.
    pub fn fires_on(&self, statement: &str) -> bool {
        self.risk_markers
            .iter()
            .any(|m| !m.is_empty() && statement.contains(m.as_str()))
    }
}

/// Everything the pipeline needs besides the knowledge base.
///
/// Fields missing from a serialized config take their [`Default`] values,
/// so a domain pack that omits `harm_lexicon` keeps the generic lexicon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub min_confidence_threshold: f64,
    /// Ordered; the first match wins.
    pub harm_lexicon: Vec<HarmPatternSpec>,
    /// `None` disables the restricted-source scan.
    pub restricted_source_marker: Option<String>,
    /// Ordered; the first match wins.
    pub goal_triggers: Vec<GoalTriggerSpec>,
    pub entity_patterns: Vec<String>,
    pub escalation: Option<EscalationRule>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_confidence_threshold: DEFAULT_MIN_CONFIDENCE,
            harm_lexicon: default_harm_lexicon(),
            restricted_source_marker: Some(DEFAULT_RESTRICTED_MARKER.to_string()),
            goal_triggers: Vec::new(),
            entity_patterns: Vec::new(),
            escalation: None,
        }
    }
}

impl PipelineConfig {
    /// A configuration with no harm patterns, no restricted marker and no rules.
    pub fn empty() -> Self {
        Self {
            harm_lexicon: Vec::new(),
            restricted_source_marker: None,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.min_confidence_threshold = threshold;
        self
    }

    pub fn with_harm_pattern(
        mut self,
        label: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        self.harm_lexicon.push(HarmPatternSpec::new(label, pattern));
        self
    }

    pub fn with_restricted_source_marker(mut self, marker: Option<String>) -> Self {
        self.restricted_source_marker = marker;
        self
    }

    pub fn with_goal_trigger(mut self, trigger: GoalTriggerSpec) -> Self {
        self.goal_triggers.push(trigger);
        self
    }

    pub fn with_entity_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.entity_patterns.push(pattern.into());
        self
    }

    pub fn with_escalation(mut self, rule: EscalationRule) -> Self {
        self.escalation = Some(rule);
        self
    }

    /// Check scalar settings. Patterns are checked when compiled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_unit_interval(self.min_confidence_threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                threshold: self.min_confidence_threshold,
            });
        }
        if self.restricted_source_marker.as_deref() == Some("") {
            return Err(ConfigError::EmptyRestrictedMarker);
        }
        if let Some(rule) = &self.escalation {
            if rule.statement.trim().is_empty() {
                return Err(ConfigError::EmptyEscalationStatement);
            }
        }
        Ok(())
    }
}

/// Generic English harm-intent lexicon: weapon-making, self-harm and
/// substance harm, security bypass.
pub fn default_harm_lexicon() -> Vec<HarmPatternSpec> {
    vec![
        HarmPatternSpec::new(
            "weapon-making",
            r"\b(make|build|manufacture|assemble)\s+(an?\s+)?(weapon|bomb|explosive|firearm)s?\b|\bcause\s+harm\b",
        ),
        HarmPatternSpec::new(
            "self-harm",
            r"\b(suicide|kill\s+(myself|himself|herself|themselves))\b|\b(illegal|illicit)\s+drugs?\b|\bpoison\s+(someone|somebody|a\s+person)\b",
        ),
        HarmPatternSpec::new(
            "security-bypass",
            r"\bhack(s|ed|ing)?\b|\bcrack(ing)?\s+(the\s+|a\s+)?(password|license|encryption)\b|\bbypass(ing)?\s+(the\s+)?(security|authentication|login|firewall)\b",
        ),
    ]
}

/// Compile a case-insensitive pattern, tagging failures with its role.
pub(crate) fn compile_pattern(role: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern {
            role,
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

//! Query parsing: a narrow pattern-to-goal mapper.
//!
//! Goal triggers are tried in order and the first match assigns the goal
//! tag; with no match the goal is [`GENERIC_GOAL`]. Observations are the
//! matches of the entity patterns, ordered by where they occur in the query.
//! Nothing here attempts real language understanding.

use regex::Regex;
use serde::Serialize;

use crate::config::{compile_pattern, GoalTriggerSpec};
use crate::error::ConfigError;

/// Goal assigned when no trigger matches.
pub const GENERIC_GOAL: &str = "decision";

#[derive(Debug, Clone)]
struct GoalTrigger {
    regex: Regex,
    goal: String,
    escalates: bool,
}

/// Result of parsing a raw query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    pub raw_text: String,
    pub goal: String,
    /// The matched trigger asks for the escalation statement.
    pub escalates: bool,
    pub observations: Vec<String>,
}

/// Compiled goal triggers and entity patterns.
#[derive(Debug, Clone)]
pub struct QueryParser {
    triggers: Vec<GoalTrigger>,
    entity_patterns: Vec<Regex>,
}

impl QueryParser {
    pub fn new(
        triggers: &[GoalTriggerSpec],
        entity_patterns: &[String],
    ) -> Result<Self, ConfigError> {
        let triggers = triggers
            .iter()
            .map(|spec| {
                Ok(GoalTrigger {
                    regex: compile_pattern("goal trigger", &spec.pattern)?,
                    goal: spec.goal.clone(),
                    escalates: spec.escalates,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let entity_patterns = entity_patterns
            .iter()
            .map(|p| compile_pattern("entity", p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            triggers,
            entity_patterns,
        })
    }

    pub fn parse(&self, query: &str) -> ParsedQuery {
        let (goal, escalates) = self
            .triggers
            .iter()
            .find(|t| t.regex.is_match(query))
            .map(|t| (t.goal.clone(), t.escalates))
            .unwrap_or_else(|| (GENERIC_GOAL.to_string(), false));

        let mut spans: Vec<(usize, usize)> = self
            .entity_patterns
            .iter()
            .flat_map(|re| re.find_iter(query).map(|m| (m.start(), m.end())))
            .collect();
        spans.sort_unstable();
        spans.dedup();

        ParsedQuery {
            raw_text: query.to_string(),
            goal,
            escalates,
            observations: spans
                .into_iter()
                .map(|(start, end)| query[start..end].to_string())
                .collect(),
        }
    }
}

//! Decision pipeline: the nine-stage orchestrator.
//!
//! ```text
//! parse → retrieve → build chain → boundary ─┬─ violation → Refused
//!                                            └─ entailment → confidence
//!                                               → cross-validation → gate ─┬─ Insufficient
//!                                                                          └─ Finalized
//! ```
//!
//! Stages run strictly in order, synchronously, with no I/O. The knowledge
//! base is shared read-only, so a single pipeline can serve any number of
//! concurrent requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::boundary::BoundaryFilter;
use crate::config::{EscalationRule, PipelineConfig};
use crate::confidence;
use crate::crossval::CrossValidator;
use crate::decision::{Decision, GateReport};
use crate::entailment::{self, normalize, NEGATION_PREFIX};
use crate::error::ProofgateResult;
use crate::knowledge::{Fact, KnowledgeBase};
use crate::parse::{ParsedQuery, QueryParser};
use crate::proof::{LogicalStep, ProofChain, INSUFFICIENT_EVIDENCE};

/// Built-in pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Map the query to a goal and observations.
    Parse,
    /// Keyword lookup in the knowledge base.
    Retrieve,
    /// Turn facts into proof nodes and apply the escalation rule.
    BuildChain,
    /// Harm lexicon and restricted-source policy.
    Boundary,
    /// Terminal statement against the goal.
    Entailment,
    /// Mean weighted confidence, bucketed.
    Confidence,
    /// Independent prediction of the terminal statement.
    CrossValidation,
    /// Threshold, agreement and entailment gates.
    Gate,
    /// Answer polarity and audit codes.
    Finalize,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Parse,
        Stage::Retrieve,
        Stage::BuildChain,
        Stage::Boundary,
        Stage::Entailment,
        Stage::Confidence,
        Stage::CrossValidation,
        Stage::Gate,
        Stage::Finalize,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Parse => "parse",
            Stage::Retrieve => "retrieve",
            Stage::BuildChain => "build-chain",
            Stage::Boundary => "boundary",
            Stage::Entailment => "entailment",
            Stage::Confidence => "confidence",
            Stage::CrossValidation => "cross-validation",
            Stage::Gate => "gate",
            Stage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Hard deadline checked at the stage boundaries after the boundary check.
struct Deadline {
    budget: Option<(Instant, Duration)>,
}

impl Deadline {
    fn none() -> Self {
        Self { budget: None }
    }

    fn after(budget: Duration) -> Self {
        Self {
            budget: Some((Instant::now(), budget)),
        }
    }

    /// A timeout decision if the budget ran out before `stage`.
    fn check(&self, stage: Stage) -> Option<Decision> {
        let (start, budget) = self.budget?;
        if start.elapsed() <= budget {
            return None;
        }
        tracing::warn!(
            %stage,
            budget_ms = budget.as_secs_f64() * 1000.0,
            "time budget exceeded, abandoning request"
        );
        Some(Decision::timed_out(budget, stage))
    }
}

/// Return the timeout decision from the enclosing function when the
/// deadline has passed.
macro_rules! checkpoint {
    ($deadline:expr, $stage:expr) => {
        if let Some(decision) = $deadline.check($stage) {
            return decision;
        }
    };
}

/// The decision-verification pipeline.
///
/// Composition over a [`PipelineConfig`] and a seeded [`KnowledgeBase`];
/// domain specializations only differ in the data they supply.
#[derive(Debug)]
pub struct DecisionPipeline {
    config: PipelineConfig,
    knowledge: Arc<KnowledgeBase>,
    boundary: BoundaryFilter,
    parser: QueryParser,
    validator: CrossValidator,
}

impl DecisionPipeline {
    /// Validate the configuration, compile its patterns and take ownership
    /// of the knowledge base. No facts can be added afterwards.
    pub fn new(config: PipelineConfig, knowledge: KnowledgeBase) -> ProofgateResult<Self> {
        Self::with_shared_knowledge(config, Arc::new(knowledge))
    }

    /// Like [`new`](Self::new) but over a knowledge base shared with other
    /// pipelines.
    pub fn with_shared_knowledge(
        config: PipelineConfig,
        knowledge: Arc<KnowledgeBase>,
    ) -> ProofgateResult<Self> {
        config.validate()?;
        let boundary = BoundaryFilter::new(
            &config.harm_lexicon,
            config.restricted_source_marker.as_deref(),
        )?;
        let parser = QueryParser::new(&config.goal_triggers, &config.entity_patterns)?;
        let validator = CrossValidator::new(config.escalation.as_ref());

        tracing::info!(
            facts = knowledge.len(),
            harm_patterns = boundary.lexicon_len(),
            threshold = config.min_confidence_threshold,
            escalation = config.escalation.as_ref().map(|r| r.statement.as_str()),
            "decision pipeline ready"
        );

        Ok(Self {
            config,
            knowledge,
            boundary,
            parser,
            validator,
        })
    }

    /// Run a query through every stage without a time budget.
    pub fn decide(&self, query: &str) -> Decision {
        self.run(query, &Deadline::none())
    }

    /// Run a query with a hard time budget.
    ///
    /// The deadline is checked between the stages that follow the boundary
    /// check; when it has passed the request ends as an insufficient-data
    /// decision naming the budget. Refusals are always reported.
    pub fn decide_within(&self, query: &str, budget: Duration) -> Decision {
        self.run(query, &Deadline::after(budget))
    }

    /// Decide independent queries in parallel, preserving input order.
    pub fn decide_batch<S: AsRef<str> + Sync>(&self, queries: &[S]) -> Vec<Decision> {
        queries.par_iter().map(|q| self.decide(q.as_ref())).collect()
    }

    /// Parse a query without deciding it.
    pub fn parse(&self, query: &str) -> ParsedQuery {
        self.parser.parse(query)
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Shared handle to the knowledge base.
    pub fn shared_knowledge(&self) -> Arc<KnowledgeBase> {
        Arc::clone(&self.knowledge)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn run(&self, query: &str, deadline: &Deadline) -> Decision {
        // Parse, retrieve, build and boundary always run: a refusal must not
        // be lost to an expired deadline.
        let parsed = self.parser.parse(query);
        tracing::debug!(
            stage = %Stage::Parse,
            goal = %parsed.goal,
            escalates = parsed.escalates,
            observations = parsed.observations.len(),
            "parsed query"
        );

        let facts = self.knowledge.query(&parsed.raw_text);
        tracing::debug!(stage = %Stage::Retrieve, facts = facts.len(), "retrieved facts");

        let chain = self.build_chain(&facts);
        tracing::debug!(
            stage = %Stage::BuildChain,
            nodes = chain.len(),
            conclusion = chain.conclusion(),
            "built proof chain"
        );

        if let Some(violation) = self.boundary.check(&parsed.raw_text, chain.nodes()) {
            tracing::warn!(
                stage = %Stage::Boundary,
                category = %violation.category,
                reason = %violation.reason,
                "request refused"
            );
            return Decision::refused(&violation);
        }

        checkpoint!(deadline, Stage::Entailment);
        let goal = self.entailment_goal(&parsed);
        let entailed = entailment::verify(chain.nodes(), &goal);

        checkpoint!(deadline, Stage::Confidence);
        let assessment = confidence::assess(&chain);

        checkpoint!(deadline, Stage::CrossValidation);
        let cross_validation = self.validator.validate(&parsed.raw_text, chain.nodes());

        checkpoint!(deadline, Stage::Gate);
        let report = GateReport {
            assessment,
            threshold: self.config.min_confidence_threshold,
            cross_validation,
            entailed,
            goal,
        };
        if !report.passes() {
            tracing::debug!(
                stage = %Stage::Gate,
                confidence = assessment.value,
                label = %assessment.label,
                agree = report.cross_validation.agree,
                entailed,
                "gate not passed, insufficient data"
            );
            return Decision::insufficient(chain, &report);
        }

        checkpoint!(deadline, Stage::Finalize);
        let answer = self.answer_for(chain.conclusion());
        let decision = Decision::finalized(chain, &report, answer);
        tracing::info!(
            stage = %Stage::Finalize,
            answer,
            confidence = decision.confidence,
            code = %decision.verification_code,
            "decision finalized"
        );
        decision
    }

    /// One node per retrieved fact, the escalation node if a high-risk
    /// marker was retrieved, and `INSUFFICIENT_EVIDENCE` if still empty.
    fn build_chain(&self, facts: &[&Fact]) -> ProofChain {
        let mut chain = ProofChain::new();
        for fact in facts {
            chain.push_fact(fact);
        }

        if let Some(rule) = &self.config.escalation {
            if chain.nodes().iter().any(|n| rule.fires_on(&n.statement)) {
                chain.push_synthesized(rule.statement.clone(), LogicalStep::InferRisk);
            }
        }

        if chain.is_empty() {
            chain.push_synthesized(INSUFFICIENT_EVIDENCE, LogicalStep::NoInference);
        }
        chain
    }

    fn entailment_goal(&self, parsed: &ParsedQuery) -> String {
        match (&self.config.escalation, parsed.escalates) {
            (Some(rule), true) => rule.statement.clone(),
            _ => parsed.goal.clone(),
        }
    }

    /// Answer polarity of a finalized conclusion.
    fn answer_for(&self, conclusion: &str) -> bool {
        answer_polarity(conclusion, self.config.escalation.as_ref())
    }
}

/// The escalation statement answers with its rule's polarity; a negated or
/// insufficient conclusion answers no; anything else answers yes.
pub fn answer_polarity(conclusion: &str, escalation: Option<&EscalationRule>) -> bool {
    let conclusion = normalize(conclusion);
    if let Some(rule) = escalation {
        if conclusion == normalize(&rule.statement) {
            return rule.answer;
        }
    }
    !(conclusion.starts_with(NEGATION_PREFIX) || conclusion.starts_with("insufficient"))
}

// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # proofgate
//!
//! A decision-verification pipeline for high-stakes yes/no questions. A
//! question is answered only when an auditable proof chain, built from an
//! evidence-backed knowledge base, clears every gate: boundary filtering,
//! entailment, a confidence threshold and independent cross-validation.
//! Anything short of that ends as a refusal or an explicit
//! insufficient-data result.
//!
//! ## Architecture
//!
//! - **Knowledge** (`knowledge`, `evidence`): append-only facts with typed evidence
//! - **Proof** (`proof`, `audit`): proof chains and their content hashes
//! - **Gates** (`boundary`, `entailment`, `confidence`, `crossval`)
//! - **Pipeline** (`pipeline`): the nine-stage orchestrator producing a `Decision`
//! - **Domains** (`domain`): TOML packs specializing the pipeline
//!
//! ## Library usage
//!
//! ```no_run
//! use proofgate::domain::DomainRegistry;
//!
//! let registry = DomainRegistry::bundled();
//! let pipeline = registry.get("medical").unwrap().compile().unwrap();
//! let decision = pipeline.decide("Chest pain and blood pressure 170/110. Transfer to ICU?");
//! println!("{} ({})", decision.answer, decision.verification_code);
//! ```

pub mod audit;
pub mod boundary;
pub mod confidence;
pub mod config;
pub mod crossval;
pub mod decision;
pub mod domain;
pub mod entailment;
pub mod error;
pub mod evidence;
pub mod knowledge;
pub mod parse;
pub mod pipeline;
pub mod proof;

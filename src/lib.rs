// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # akh-match
//!
//! Pattern matching over a hypergraph of typed atoms. A pattern is a
//! template with typed variables plus constraints; the matcher finds every
//! substitution of variables by stored atoms that makes the template present
//! and satisfies the constraints.
//!
//! ## Architecture
//!
//! - **Atoms** (`atom`, `store`): content-addressed leaves and links behind the `AtomStore` trait
//! - **Patterns** (`pattern`): templates, variables, constraints and bindings
//! - **Matcher** (`matcher`): backtracking unification with result caps and timeouts
//! - **Composition** (`compose`): AND / OR / NOT / bounded recursion over named patterns
//! - **Temporal** (`temporal`): timestamped sequences, intervals and repetition
//! - **Learning** (`learn`): frequent link structures turned into patterns
//! - **Statistics** (`stats`): truth-value scoring, fuzzy relaxation, Bayes, Monte Carlo
//! - **Queries** (`query`): fluent builder over all of the above
//!
//! ## Library usage
//!
//! ```no_run
//! use akh_match::config::EngineConfig;
//! use akh_match::engine::PatternEngine;
//! use akh_match::pattern::{Pattern, Term};
//!
//! let engine = PatternEngine::new(EngineConfig::default()).unwrap();
//! engine
//!     .assert_term(&Term::inheritance(Term::concept("dog"), Term::concept("animal")))
//!     .unwrap();
//! let pattern = Pattern::new(Term::inheritance(Term::variable("x"), Term::concept("animal")));
//! let results = engine.match_pattern(&pattern).unwrap();
//! assert_eq!(results.len(), 1);
//! ```

pub mod atom;
pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod learn;
pub mod matcher;
pub mod pattern;
pub mod query;
pub mod stats;
pub mod store;
pub mod temporal;

//! End-to-end integration tests for the akh-match engine.
//!
//! These tests drive every layer through `PatternEngine`, checking the
//! matcher's guarantees (ground templates, consistent bindings, result caps,
//! timeouts) and the set semantics of composition, together with the
//! statistical, temporal and learning layers built on top.

use std::collections::HashSet;

use akh_match::atom::{AtomId, AtomType, TruthValue};
use akh_match::config::{EngineConfig, MatcherConfig, StatisticsConfig};
use akh_match::engine::PatternEngine;
use akh_match::error::{MatchError, PatternError};
use akh_match::export::export_matches_json;
use akh_match::pattern::{Constraint, MatchResult, Pattern, Term};
use akh_match::store::AtomStore;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn test_engine() -> PatternEngine {
    init_tracing();
    PatternEngine::new(EngineConfig::default()).unwrap()
}

fn engine_with(config: EngineConfig) -> PatternEngine {
    init_tracing();
    PatternEngine::new(config).unwrap()
}

fn isa(child: &str, parent: &str) -> Term {
    Term::inheritance(Term::concept(child), Term::concept(parent))
}

fn var_isa(parent: &str) -> Pattern {
    Pattern::new(Term::inheritance(Term::variable("x"), Term::concept(parent)))
}

/// A small taxonomy with pets and a cycle between `a` and `b`.
fn zoo() -> PatternEngine {
    let engine = test_engine();
    for (child, parent) in [
        ("dog", "mammal"),
        ("cat", "mammal"),
        ("whale", "mammal"),
        ("sparrow", "bird"),
        ("mammal", "animal"),
        ("bird", "animal"),
        ("dog", "pet"),
        ("cat", "pet"),
        ("sparrow", "pet"),
        ("a", "b"),
        ("b", "a"),
    ] {
        engine.assert_term(&isa(child, parent)).unwrap();
    }
    engine
}

fn concept(engine: &PatternEngine, name: &str) -> AtomId {
    engine.store().resolve(&Term::concept(name)).unwrap()
}

fn signatures(results: &[MatchResult]) -> HashSet<String> {
    results.iter().map(MatchResult::signature).collect()
}

// ---------------------------------------------------------------------------
// Core matcher
// ---------------------------------------------------------------------------

#[test]
fn dog_isa_animal_binds_x_to_dog() {
    let engine = test_engine();
    engine.assert_term(&isa("dog", "animal")).unwrap();

    let results = engine.match_pattern(&var_isa("animal")).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].bindings().len(), 1);
    assert_eq!(results[0].get("$x"), Some(concept(&engine, "dog")));
}

#[test]
fn every_present_ground_template_matches_exactly_once() {
    let engine = zoo();
    let store = engine.store();
    for id in store.atoms_by_type(&AtomType::Inheritance) {
        let template = store.to_term(id).unwrap();
        let results = engine.match_pattern(&Pattern::new(template)).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].bindings().is_empty());
        assert_eq!(results[0].matched_atoms(), &[id]);
    }
}

#[test]
fn repeated_variable_binds_one_atom() {
    let engine = zoo();
    engine
        .assert_term(&Term::link(
            AtomType::Similarity,
            vec![Term::concept("dog"), Term::concept("dog")],
        ))
        .unwrap();
    engine
        .assert_term(&Term::link(
            AtomType::Similarity,
            vec![Term::concept("dog"), Term::concept("cat")],
        ))
        .unwrap();

    // $x ISA $y and $y ISA $x: only the a/b cycle satisfies both.
    let cyclic = Pattern::new(Term::and(vec![
        Term::inheritance(Term::variable("x"), Term::variable("y")),
        Term::inheritance(Term::variable("y"), Term::variable("x")),
    ]));
    let results = engine.match_pattern(&cyclic).unwrap();
    assert_eq!(results.len(), 2);
    for r in &results {
        assert_ne!(r.get("$x"), r.get("$y"));
    }

    let reflexive = Pattern::new(Term::link(
        AtomType::Similarity,
        vec![Term::variable("x"), Term::variable("x")],
    ));
    let results = engine.match_pattern(&reflexive).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get("$x"), Some(concept(&engine, "dog")));
}

#[test]
fn max_results_is_never_exceeded() {
    let engine = zoo();
    let pattern = Pattern::new(Term::inheritance(Term::variable("x"), Term::variable("y")));
    let all = engine.match_pattern(&pattern).unwrap().len();
    assert_eq!(all, 11);

    for k in [0, 1, 3, 10, 11, 50] {
        let results = engine
            .matcher()
            .with_max_results(k)
            .match_pattern(&pattern)
            .unwrap();
        assert!(results.len() <= k);
        assert_eq!(results.len(), k.min(all));
    }
}

#[test]
fn expired_timeout_returns_no_results() {
    let engine = engine_with(EngineConfig {
        matcher: MatcherConfig {
            timeout_ms: Some(0),
            ..MatcherConfig::default()
        },
        ..EngineConfig::default()
    });
    engine.assert_term(&isa("dog", "animal")).unwrap();

    let err = engine.match_pattern(&var_isa("animal")).unwrap_err();
    assert!(matches!(err, PatternError::Match(MatchError::Timeout { .. })));
}

#[test]
fn constraint_errors_abort_the_match() {
    let engine = zoo();
    let pattern = var_isa("mammal")
        .with_constraint(Constraint::greater_than(Term::variable("x"), Term::number(0.0)));
    assert!(matches!(
        engine.match_pattern(&pattern).unwrap_err(),
        PatternError::Match(MatchError::NonNumeric { .. })
    ));
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

#[test]
fn and_is_symmetric_on_compatible_bindings() {
    let engine = zoo();
    let mut composer = engine.composer();
    composer.register("mammal", var_isa("mammal"));
    composer.register("pet", var_isa("pet"));

    let mammals = engine.match_pattern(&var_isa("mammal")).unwrap();
    let pets = engine.match_pattern(&var_isa("pet")).unwrap();

    let ab = composer.compose_and(&["mammal", "pet"]).unwrap();
    let ba = composer.compose_and(&["pet", "mammal"]).unwrap();

    for r in &ab {
        assert!(mammals.contains(r));
        assert!(pets.iter().any(|p| r.bindings().is_compatible(p.bindings())));
    }
    for r in &ba {
        assert!(pets.contains(r));
        assert!(mammals.iter().any(|m| r.bindings().is_compatible(m.bindings())));
    }
    assert_eq!(signatures(&ab), signatures(&ba));
    assert_eq!(ab.len(), 2);
}

#[test]
fn or_covers_both_operands() {
    let engine = zoo();
    let mut composer = engine.composer();
    composer.register("bird", var_isa("bird"));
    composer.register("pet", var_isa("pet"));

    let birds = engine.match_pattern(&var_isa("bird")).unwrap();
    let pets = engine.match_pattern(&var_isa("pet")).unwrap();
    let union = composer.compose_or(&["bird", "pet"]).unwrap();

    let sigs = signatures(&union);
    assert_eq!(sigs.len(), union.len());
    assert!(signatures(&birds).is_subset(&sigs));
    assert!(signatures(&pets).is_subset(&sigs));
    assert!(union.len() <= birds.len() + pets.len());
}

#[test]
fn not_excludes_shared_pairs() {
    let engine = zoo();
    let mut composer = engine.composer();
    composer.register("pet", var_isa("pet"));
    composer.register("mammal", var_isa("mammal"));

    let excluded = engine.match_pattern(&var_isa("mammal")).unwrap();
    let results = composer.compose_not("pet", "mammal").unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get("$x"), Some(concept(&engine, "sparrow")));
    for r in &results {
        assert!(!excluded.iter().any(|x| r.bindings().shares_pair(x.bindings())));
    }
}

#[test]
fn recursion_terminates_over_cycles() {
    let engine = zoo();
    let mut composer = engine.composer();
    composer.register(
        "closure",
        Pattern::new(Term::and(vec![
            Term::inheritance(Term::variable("x"), Term::variable("y")),
            Term::inheritance(Term::variable("y"), Term::variable("z")),
        ])),
    );

    let mut rounds = 0;
    let store = engine.store();
    let results = composer
        .compose_recursive_with("closure", 4, |_, fresh| {
            rounds += 1;
            for r in fresh {
                if let (Some(x), Some(z)) = (r.get("$x"), r.get("$z")) {
                    store.add_link(AtomType::Inheritance, vec![x, z])?;
                }
            }
            Ok(())
        })
        .unwrap();
    assert!(rounds <= 4);
    assert!(!results.is_empty());
    assert!(store.resolve(&isa("dog", "animal")).is_some());
    assert!(store.resolve(&isa("a", "a")).is_some());

    let bounded = composer.compose_recursive("closure", 3).unwrap();
    assert!(!bounded.is_empty());
}

// ---------------------------------------------------------------------------
// Statistical layer
// ---------------------------------------------------------------------------

#[test]
fn truth_value_probability_scenario() {
    for (threshold, kept) in [(0.5, true), (0.84, true), (0.86, false)] {
        let engine = engine_with(EngineConfig {
            statistics: StatisticsConfig {
                fuzzy_threshold: threshold,
                ..StatisticsConfig::default()
            },
            ..EngineConfig::default()
        });
        let dog = engine.assert_term(&Term::concept("dog")).unwrap();
        engine.store().set_truth(dog, TruthValue::new(0.9, 0.8)).unwrap();

        let results = engine
            .statistics()
            .unwrap()
            .probabilistic_match(&Pattern::new(Term::concept("dog")))
            .unwrap();
        assert_eq!(!results.is_empty(), kept, "threshold {threshold}");
        if kept {
            assert!((results[0].probability - 0.85).abs() < 1e-6);
        }
    }
}

#[test]
fn bayesian_without_hypothesis_matches_is_none() {
    let engine = zoo();
    let estimate = engine
        .statistics()
        .unwrap()
        .bayesian_inference(&[var_isa("mammal")], &var_isa("reptile"))
        .unwrap();
    assert!(estimate.is_none());
}

// ---------------------------------------------------------------------------
// Temporal and learning layers
// ---------------------------------------------------------------------------

#[test]
fn sequence_then_repetition() {
    let engine = zoo();
    let mut temporal = engine.temporal();
    let first = temporal
        .match_sequence(&[var_isa("mammal"), var_isa("bird")], "walk")
        .unwrap();
    assert!(first.ordered);
    assert_eq!(first.steps[0].timestamps.len(), 3);
    assert_eq!(first.steps[0].duration, 2);

    temporal
        .match_sequence(&[var_isa("bird")], "flight")
        .unwrap();
    let repeating = temporal.detect_repeating_patterns(2).unwrap();
    assert_eq!(repeating.len(), 1);
    assert_eq!(repeating[0].template, var_isa("bird").template().to_string());
}

#[test]
fn learned_patterns_reapply() {
    let engine = zoo();
    let mut learner = engine.learner().unwrap();
    let learned = learner.learn_patterns().unwrap();
    assert!(!learned.is_empty());
    for lp in &learned {
        assert!(lp.examples.len() <= engine.config().learning.max_examples);
        assert!((0.0..=1.0).contains(&lp.frequency));
        assert!((0.0..=1.0).contains(&lp.confidence));
    }
    let applied = learner.apply_learned_patterns().unwrap();
    assert!(!applied.is_empty());
}

// ---------------------------------------------------------------------------
// Configuration and export
// ---------------------------------------------------------------------------

#[test]
fn engine_from_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(
        &path,
        "[matcher]\nmax_results = 2\n\n[statistics]\nseed = 11\nfuzzy_threshold = 0.25\n",
    )
    .unwrap();

    let engine = engine_with(EngineConfig::load(&path).unwrap());
    for (child, parent) in [("dog", "mammal"), ("cat", "mammal"), ("whale", "mammal")] {
        engine.assert_term(&isa(child, parent)).unwrap();
    }
    assert_eq!(engine.match_pattern(&var_isa("mammal")).unwrap().len(), 2);

    let mut stats = engine.statistics().unwrap();
    let sampled = stats.monte_carlo_sampling(&var_isa("mammal"), 20).unwrap();
    assert!(sampled.len() <= 2);
}

#[test]
fn query_builder_round_trip_to_json() {
    let engine = test_engine();
    let mut q = engine.query();
    q.assert_term(&q.evaluation(q.predicate("likes"), vec![q.concept("alice"), q.concept("bob")]))
        .unwrap();
    q.assert_term(&q.evaluation(q.predicate("likes"), vec![q.concept("bob"), q.concept("bob")]))
        .unwrap();

    q.constrain_type("who", [AtomType::Concept]);
    let results = q
        .execute(q.evaluation(q.predicate("likes"), vec![q.variable("who"), q.concept("bob")]))
        .unwrap();
    assert_eq!(results.len(), 2);

    let json = export_matches_json(&results, engine.store()).unwrap();
    assert!(json.contains("(Concept \\\"alice\\\")"));
    assert!(json.contains("$who"));
}

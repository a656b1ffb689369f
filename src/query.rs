//! Fluent query builder.
//!
//! Builds templates from helper constructors, accumulates constraints, and
//! runs the finished pattern through the exact, probabilistic or fuzzy
//! matcher:
//!
//! ```ignore
//! let mut q = engine.query();
//! let who = q.variable("who");
//! q.constrain_greater_than(q.variable("age"), q.number(25.0));
//! let results = q.execute(q.evaluation(q.predicate("age"), vec![who, q.variable("age")]))?;
//! ```

use crate::atom::{AtomId, AtomType};
use crate::config::{MatcherConfig, StatisticsConfig};
use crate::error::PatternResult;
use crate::matcher::PatternMatcher;
use crate::pattern::{Constraint, MatchResult, Pattern, Term};
use crate::stats::{ProbabilisticMatch, StatisticalMatcher};
use crate::store::AtomStore;

pub struct QueryBuilder<'s, S: AtomStore + ?Sized> {
    store: &'s S,
    matcher_config: MatcherConfig,
    statistics_config: StatisticsConfig,
    constraints: Vec<Constraint>,
    variable_types: Vec<(String, AtomType)>,
}

impl<'s, S: AtomStore + ?Sized> QueryBuilder<'s, S> {
    pub fn new(
        store: &'s S,
        matcher_config: MatcherConfig,
        statistics_config: StatisticsConfig,
    ) -> Self {
        Self {
            store,
            matcher_config,
            statistics_config,
            constraints: Vec::new(),
            variable_types: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Terms
    // -----------------------------------------------------------------------

    pub fn variable(&self, name: &str) -> Term {
        Term::variable(name)
    }

    /// A variable that may only bind to atoms of `atom_type`.
    pub fn typed_variable(&mut self, name: &str, atom_type: AtomType) -> Term {
        let term = Term::variable(name);
        if let Some(var) = term.as_variable() {
            self.variable_types.push((var.to_string(), atom_type));
        }
        term
    }

    pub fn concept(&self, name: &str) -> Term {
        Term::concept(name)
    }

    pub fn predicate(&self, name: &str) -> Term {
        Term::predicate(name)
    }

    pub fn number(&self, value: f64) -> Term {
        Term::number(value)
    }

    pub fn inheritance(&self, child: Term, parent: Term) -> Term {
        Term::inheritance(child, parent)
    }

    pub fn evaluation(&self, predicate: Term, arguments: Vec<Term>) -> Term {
        Term::evaluation(predicate, arguments)
    }

    pub fn link(&self, atom_type: AtomType, outgoing: Vec<Term>) -> Term {
        Term::link(atom_type, outgoing)
    }

    // -----------------------------------------------------------------------
    // Constraints
    // -----------------------------------------------------------------------

    pub fn constrain_type(
        &mut self,
        variable: &str,
        allowed: impl IntoIterator<Item = AtomType>,
    ) -> &mut Self {
        self.constraints.push(Constraint::of_type(variable, allowed));
        self
    }

    pub fn constrain_equal(&mut self, left: Term, right: Term) -> &mut Self {
        self.constraints.push(Constraint::equal(left, right));
        self
    }

    pub fn constrain_greater_than(&mut self, left: Term, right: Term) -> &mut Self {
        self.constraints.push(Constraint::greater_than(left, right));
        self
    }

    pub fn constrain_present(&mut self, terms: Vec<Term>) -> &mut Self {
        self.constraints.push(Constraint::present(terms));
        self
    }

    pub fn constrain_absent(&mut self, terms: Vec<Term>) -> &mut Self {
        self.constraints.push(Constraint::absent(terms));
        self
    }

    /// Drop accumulated constraints and variable types.
    pub fn reset(&mut self) -> &mut Self {
        self.constraints.clear();
        self.variable_types.clear();
        self
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// The pattern `execute` would run for `template`.
    pub fn build(&self, template: Term) -> Pattern {
        let mut pattern = Pattern::new(template);
        for (name, atom_type) in &self.variable_types {
            pattern = pattern.with_variable_type(name, atom_type.clone());
        }
        for constraint in &self.constraints {
            pattern.add_constraint(constraint.clone());
        }
        pattern
    }

    pub fn execute(&self, template: Term) -> PatternResult<Vec<MatchResult>> {
        self.matcher().match_pattern(&self.build(template))
    }

    pub fn execute_probabilistic(&self, template: Term) -> PatternResult<Vec<ProbabilisticMatch>> {
        self.statistics()?
            .probabilistic_match(&self.build(template))
    }

    pub fn execute_fuzzy(&self, template: Term) -> PatternResult<Vec<ProbabilisticMatch>> {
        self.statistics()?.fuzzy_match(&self.build(template))
    }

    /// Assert a ground term into the store.
    pub fn assert_term(&self, term: &Term) -> PatternResult<AtomId> {
        self.store.insert_term(term)
    }

    fn matcher(&self) -> PatternMatcher<'s, S> {
        PatternMatcher::new(self.store, self.matcher_config.clone())
    }

    fn statistics(&self) -> PatternResult<StatisticalMatcher<'s, S>> {
        StatisticalMatcher::new(self.matcher(), self.statistics_config.clone())
    }
}

//! Core matcher: backtracking unification of a pattern against the store.
//!
//! The template is split into clauses (the children of an `And` root, or the
//! template itself). Search is a depth-first walk over an explicit stack of
//! `SearchState` frames owned by a single [`PatternMatcher::match_pattern`]
//! call: each frame records the bindings so far, the atoms matched so far and
//! the next clause to satisfy. Expanding a frame enumerates candidate atoms
//! for its clause and pushes one child frame per consistent candidate.
//!
//! Within a clause, children are compared strictly positionally; type and
//! arity must agree before recursing. A variable bound earlier on the branch
//! must resolve to the identical atom, otherwise the candidate fails at once.
//! Every accepted extension re-evaluates all constraints against the
//! accumulated bindings. The deadline is checked on every loop iteration and
//! every recursive step; expiry aborts the whole call.

use std::time::{Duration, Instant};

use crate::atom::{AtomId, AtomKind};
use crate::config::MatcherConfig;
use crate::error::{MatchError, PatternResult};
use crate::pattern::{Bindings, MatchResult, Pattern, Term};
use crate::store::AtomStore;

// ---------------------------------------------------------------------------
// Search bookkeeping
// ---------------------------------------------------------------------------

/// One frame of the backtracking stack.
#[derive(Debug, Clone, Default)]
struct SearchState {
    bindings: Bindings,
    matched_atoms: Vec<AtomId>,
    clause_index: usize,
}

/// Wall-clock budget for one match call.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn new(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    fn check(&self) -> PatternResult<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let elapsed = self.started.elapsed();
        if elapsed >= limit {
            return Err(MatchError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
                limit_ms: limit.as_millis() as u64,
            }
            .into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Backtracking pattern matcher over a borrowed atom store.
///
/// Holds no mutable state; every call builds its own search stack, so one
/// matcher can serve any number of sequential calls.
pub struct PatternMatcher<'s, S: AtomStore + ?Sized> {
    store: &'s S,
    config: MatcherConfig,
}

impl<'s, S: AtomStore + ?Sized> PatternMatcher<'s, S> {
    pub fn new(store: &'s S, config: MatcherConfig) -> Self {
        Self { store, config }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.config.max_results = max_results;
        self
    }

    /// Bound each match call. Sub-millisecond budgets round up to whole
    /// milliseconds; only a zero duration expires at once.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.config.timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Find every substitution that makes the pattern present in the store.
    ///
    /// Returns at most `max_results` results. On timeout the call fails with
    /// [`MatchError::Timeout`] and no partial results; a constraint that
    /// errors also aborts the call.
    pub fn match_pattern(&self, pattern: &Pattern) -> PatternResult<Vec<MatchResult>> {
        let deadline = Deadline::new(self.config.timeout());
        deadline.check()?;

        let clauses = pattern.clauses();
        if clauses.is_empty() {
            tracing::debug!(template = %pattern.template(), "empty conjunction matches nothing");
            return Ok(Vec::new());
        }
        let max_results = self.config.max_results;
        let mut results: Vec<MatchResult> = Vec::new();
        let mut stack = vec![SearchState::default()];

        while let Some(state) = stack.pop() {
            deadline.check()?;
            if results.len() >= max_results {
                tracing::warn!(max_results, "result cap reached, truncating");
                break;
            }

            if state.clause_index == clauses.len() {
                if self.admissible(pattern, &state.bindings)? {
                    results.push(MatchResult::new(state.bindings, state.matched_atoms));
                }
                continue;
            }

            let clause = clauses[state.clause_index];
            let extensions = self.expand_clause(pattern, clause, &state.bindings, &deadline)?;
            tracing::trace!(
                clause = state.clause_index,
                extensions = extensions.len(),
                "expanded clause"
            );

            // Reverse so the first candidate is explored first.
            for (bindings, atom) in extensions.into_iter().rev() {
                let mut matched_atoms = state.matched_atoms.clone();
                matched_atoms.push(atom);
                stack.push(SearchState {
                    bindings,
                    matched_atoms,
                    clause_index: state.clause_index + 1,
                });
            }
        }

        tracing::debug!(
            template = %pattern.template(),
            results = results.len(),
            elapsed_ms = deadline.started.elapsed().as_millis() as u64,
            "pattern match complete"
        );
        Ok(results)
    }

    /// Candidate atoms for an unbound variable.
    ///
    /// Restricted to the allowed types when the pattern declares any,
    /// otherwise a type-diverse round-robin sample capped at
    /// `default_candidate_limit`.
    pub fn variable_candidates(&self, pattern: &Pattern, variable: &str) -> Vec<AtomId> {
        if let Some(mut types) = pattern.allowed_types(variable) {
            types.sort();
            types.dedup();
            return types
                .iter()
                .flat_map(|t| self.store.atoms_by_type(t))
                .collect();
        }

        let limit = self.config.default_candidate_limit;
        let per_type: Vec<Vec<AtomId>> = self
            .store
            .atom_types()
            .iter()
            .map(|t| self.store.atoms_by_type(t))
            .collect();

        let mut sample = Vec::new();
        let mut round = 0;
        loop {
            let mut progressed = false;
            for atoms in &per_type {
                if let Some(&id) = atoms.get(round) {
                    progressed = true;
                    sample.push(id);
                    if sample.len() >= limit {
                        return sample;
                    }
                }
            }
            if !progressed {
                return sample;
            }
            round += 1;
        }
    }

    // -----------------------------------------------------------------------
    // Clause expansion
    // -----------------------------------------------------------------------

    /// All consistent `(bindings, matched atom)` extensions for one clause.
    fn expand_clause(
        &self,
        pattern: &Pattern,
        clause: &Term,
        bindings: &Bindings,
        deadline: &Deadline,
    ) -> PatternResult<Vec<(Bindings, AtomId)>> {
        deadline.check()?;
        let mut extensions = Vec::new();

        if let Some(name) = clause.as_variable() {
            let candidates = match bindings.get(name) {
                Some(bound) if self.store.contains(bound) => vec![bound],
                Some(_) => Vec::new(),
                None => self.variable_candidates(pattern, name),
            };
            for candidate in candidates {
                deadline.check()?;
                let mut next = bindings.clone();
                if next.bind(name, candidate) && self.admissible(pattern, &next)? {
                    extensions.push((next, candidate));
                }
            }
            return Ok(extensions);
        }

        match clause {
            Term::Leaf { .. } => {
                if let Some(id) = self.store.resolve(clause) {
                    if self.admissible(pattern, bindings)? {
                        extensions.push((bindings.clone(), id));
                    }
                }
            }
            Term::Link { .. } => {
                for candidate in self.link_candidates(clause, bindings) {
                    deadline.check()?;
                    if let Some(next) = self.unify(clause, candidate, bindings.clone(), deadline)? {
                        if self.admissible(pattern, &next)? {
                            extensions.push((next, candidate));
                        }
                    }
                }
            }
        }

        Ok(extensions)
    }

    /// Stored links of the clause's type and arity.
    ///
    /// When some child already resolves to a stored atom (a ground child or a
    /// bound variable) only that atom's incoming set is scanned.
    fn link_candidates(&self, clause: &Term, bindings: &Bindings) -> Vec<AtomId> {
        let atom_type = clause.atom_type();
        let arity = clause.arity();

        let mut anchor: Option<AtomId> = None;
        if let Term::Link { outgoing, .. } = clause {
            for child in outgoing {
                if let Some(name) = child.as_variable() {
                    if let Some(bound) = bindings.get(name) {
                        anchor = Some(bound);
                        break;
                    }
                } else if child.is_ground() {
                    match self.store.resolve(child) {
                        Some(id) => {
                            anchor = Some(id);
                            break;
                        }
                        // A ground child that is not stored can never match.
                        None => return Vec::new(),
                    }
                }
            }
        }

        let pool = match anchor {
            Some(id) => self.store.incoming(id),
            None => self.store.atoms_by_type(atom_type),
        };
        pool.into_iter()
            .filter(|id| {
                self.store
                    .get(*id)
                    .is_some_and(|a| &a.atom_type == atom_type && a.arity() == arity)
            })
            .collect()
    }

    /// Tree-compare `term` against the stored atom `atom`.
    ///
    /// Returns the extended bindings, or `None` on any mismatch. Bindings are
    /// moved in and out so a failed candidate leaves its siblings untouched.
    fn unify(
        &self,
        term: &Term,
        atom: AtomId,
        mut bindings: Bindings,
        deadline: &Deadline,
    ) -> PatternResult<Option<Bindings>> {
        deadline.check()?;

        if let Some(name) = term.as_variable() {
            let consistent = bindings.bind(name, atom);
            return Ok(consistent.then_some(bindings));
        }

        let Some(stored) = self.store.get(atom) else {
            return Ok(None);
        };
        if &stored.atom_type != term.atom_type() {
            return Ok(None);
        }

        match (term, &stored.kind) {
            (Term::Leaf { name, .. }, AtomKind::Leaf { name: stored_name }) => {
                Ok((name == stored_name).then_some(bindings))
            }
            (Term::Link { outgoing, .. }, AtomKind::Structural { children }) => {
                if outgoing.len() != children.len() {
                    return Ok(None);
                }
                for (child_term, child) in outgoing.iter().zip(children) {
                    match self.unify(child_term, *child, bindings, deadline)? {
                        Some(next) => bindings = next,
                        None => return Ok(None),
                    }
                }
                Ok(Some(bindings))
            }
            _ => Ok(None),
        }
    }

    /// Required variable types and every constraint hold for `bindings`.
    fn admissible(&self, pattern: &Pattern, bindings: &Bindings) -> PatternResult<bool> {
        for var in pattern.variables() {
            let (Some(required), Some(bound)) = (&var.required_type, bindings.get(&var.name))
            else {
                continue;
            };
            let type_ok = self
                .store
                .get(bound)
                .is_some_and(|a| &a.atom_type == required);
            if !type_ok {
                return Ok(false);
            }
        }
        for constraint in pattern.constraints() {
            if !constraint.satisfied(bindings, self.store)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

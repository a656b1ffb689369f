//! Composition of named patterns: AND, OR, NOT and bounded recursion.
//!
//! Patterns are registered under a name and referenced by name. Every name a
//! composition mentions is looked up before any matching starts, so a typo
//! fails fast without doing search work.
//!
//! Composite results are memoized per operation and operand names. Each entry
//! remembers the store generation it was computed at and is recomputed once
//! the store has been mutated.

use std::collections::{HashMap, HashSet};

use crate::error::{ComposeError, PatternResult};
use crate::matcher::PatternMatcher;
use crate::pattern::{MatchResult, Pattern};
use crate::store::AtomStore;

/// Operation plus operand names; names are kept whole, never joined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    And(Vec<String>),
    Or(Vec<String>),
    Not { base: String, exclude: String },
    Recursive { name: String, max_depth: usize },
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    generation: u64,
    results: Vec<MatchResult>,
}

/// Registry of named patterns plus the set operations over their results.
pub struct PatternComposer<'s, S: AtomStore + ?Sized> {
    matcher: PatternMatcher<'s, S>,
    patterns: HashMap<String, Pattern>,
    cache: HashMap<CacheKey, CacheEntry>,
}

impl<'s, S: AtomStore + ?Sized> PatternComposer<'s, S> {
    pub fn new(matcher: PatternMatcher<'s, S>) -> Self {
        Self {
            matcher,
            patterns: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    pub fn matcher(&self) -> &PatternMatcher<'s, S> {
        &self.matcher
    }

    /// Register (or replace) a named pattern. Clears the result cache.
    pub fn register(&mut self, name: &str, pattern: Pattern) {
        self.patterns.insert(name.to_string(), pattern);
        self.cache.clear();
    }

    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.patterns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Results of the first pattern compatible with at least one result of
    /// every other pattern.
    pub fn compose_and(&mut self, names: &[&str]) -> PatternResult<Vec<MatchResult>> {
        let patterns = self.lookup(names)?;
        let key = CacheKey::And(owned(names));
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let sets = self.run_all(&patterns)?;
        let results = match sets.split_first() {
            Some((first, rest)) => first
                .iter()
                .filter(|candidate| {
                    rest.iter().all(|set| {
                        set.iter()
                            .any(|other| candidate.bindings().is_compatible(other.bindings()))
                    })
                })
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        tracing::debug!(patterns = names.len(), results = results.len(), "compose_and");
        self.remember(key, &results);
        Ok(results)
    }

    /// Union of every pattern's results, deduplicated by binding signature.
    pub fn compose_or(&mut self, names: &[&str]) -> PatternResult<Vec<MatchResult>> {
        let patterns = self.lookup(names)?;
        let key = CacheKey::Or(owned(names));
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for set in self.run_all(&patterns)? {
            for result in set {
                if seen.insert(result.signature()) {
                    results.push(result);
                }
            }
        }

        tracing::debug!(patterns = names.len(), results = results.len(), "compose_or");
        self.remember(key, &results);
        Ok(results)
    }

    /// Results of `base` sharing no variable→atom pair with any result of
    /// `exclude`.
    pub fn compose_not(&mut self, base: &str, exclude: &str) -> PatternResult<Vec<MatchResult>> {
        let base_pattern = self.operand("base", base)?;
        let exclude_pattern = self.operand("exclude", exclude)?;
        let key = CacheKey::Not {
            base: base.to_string(),
            exclude: exclude.to_string(),
        };
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let kept = self.matcher.match_pattern(&base_pattern)?;
        let excluded = self.matcher.match_pattern(&exclude_pattern)?;
        let results: Vec<MatchResult> = kept
            .into_iter()
            .filter(|r| !excluded.iter().any(|x| r.bindings().shares_pair(x.bindings())))
            .collect();

        tracing::debug!(base, exclude, results = results.len(), "compose_not");
        self.remember(key, &results);
        Ok(results)
    }

    /// Re-run a pattern for up to `max_depth` rounds, accumulating results.
    pub fn compose_recursive(
        &mut self,
        name: &str,
        max_depth: usize,
    ) -> PatternResult<Vec<MatchResult>> {
        let key = CacheKey::Recursive {
            name: name.to_string(),
            max_depth,
        };
        self.lookup(&[name])?;
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }
        let results = self.compose_recursive_with(name, max_depth, |_, _| Ok(()))?;
        self.remember(key, &results);
        Ok(results)
    }

    /// Bounded recursion with a hook run after every productive round.
    ///
    /// The hook receives the round number and that round's new results and
    /// may assert derived atoms through the store. Rounds stop early when a
    /// round finds nothing, or nothing not already accumulated.
    pub fn compose_recursive_with<F>(
        &mut self,
        name: &str,
        max_depth: usize,
        mut between_rounds: F,
    ) -> PatternResult<Vec<MatchResult>>
    where
        F: FnMut(usize, &[MatchResult]) -> PatternResult<()>,
    {
        let pattern = self.lookup(&[name])?.remove(0);
        let mut seen = HashSet::new();
        let mut accumulated = Vec::new();

        for round in 0..max_depth {
            let found = self.matcher.match_pattern(&pattern)?;
            if found.is_empty() {
                tracing::debug!(name, round, "recursion stopped: no matches");
                break;
            }
            let fresh: Vec<MatchResult> = found
                .into_iter()
                .filter(|r| seen.insert(r.signature()))
                .collect();
            if fresh.is_empty() {
                tracing::debug!(name, round, "recursion stopped: fixpoint");
                break;
            }
            between_rounds(round, &fresh)?;
            accumulated.extend(fresh);
        }

        Ok(accumulated)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Resolve every name up front.
    fn lookup(&self, names: &[&str]) -> PatternResult<Vec<Pattern>> {
        if names.is_empty() {
            return Err(ComposeError::Empty.into());
        }
        names
            .iter()
            .map(|name| {
                self.patterns.get(*name).cloned().ok_or_else(|| {
                    ComposeError::UnknownPattern {
                        name: name.to_string(),
                    }
                    .into()
                })
            })
            .collect()
    }

    fn operand(&self, role: &'static str, name: &str) -> PatternResult<Pattern> {
        self.patterns.get(name).cloned().ok_or_else(|| {
            ComposeError::MissingOperand {
                role,
                name: name.to_string(),
            }
            .into()
        })
    }

    fn run_all(&self, patterns: &[Pattern]) -> PatternResult<Vec<Vec<MatchResult>>> {
        patterns
            .iter()
            .map(|p| self.matcher.match_pattern(p))
            .collect()
    }

    fn cached(&self, key: &CacheKey) -> Option<Vec<MatchResult>> {
        let entry = self.cache.get(key)?;
        (entry.generation == self.matcher.store().generation()).then(|| entry.results.clone())
    }

    fn remember(&mut self, key: CacheKey, results: &[MatchResult]) {
        let generation = self.matcher.store().generation();
        self.cache.insert(
            key,
            CacheEntry {
                generation,
                results: results.to_vec(),
            },
        );
    }
}

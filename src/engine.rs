//! Engine facade: owns the atom store and the configuration, and hands out
//! the matcher and every layer built on it.
//!
//! `PatternEngine` is the explicit initialization context: it validates the
//! configuration once, and every layer it constructs borrows the same store
//! and reads its section of the same config.

use std::sync::Arc;

use crate::atom::AtomId;
use crate::compose::PatternComposer;
use crate::config::EngineConfig;
use crate::error::PatternResult;
use crate::learn::PatternLearner;
use crate::matcher::PatternMatcher;
use crate::pattern::{MatchResult, Pattern, Term};
use crate::query::QueryBuilder;
use crate::stats::StatisticalMatcher;
use crate::store::{AtomSpace, AtomStore};
use crate::temporal::TemporalMatcher;

/// Top-level handle on a pattern-matching engine.
pub struct PatternEngine {
    config: EngineConfig,
    store: Arc<AtomSpace>,
}

impl PatternEngine {
    /// Create an engine over an empty in-memory store.
    pub fn new(config: EngineConfig) -> PatternResult<Self> {
        Self::with_store(Arc::new(AtomSpace::new()), config)
    }

    /// Create an engine over an existing store.
    pub fn with_store(store: Arc<AtomSpace>, config: EngineConfig) -> PatternResult<Self> {
        config.validate()?;
        tracing::info!(
            atoms = store.len(),
            max_results = config.matcher.max_results,
            timeout_ms = ?config.matcher.timeout_ms,
            "initializing pattern engine"
        );
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &AtomSpace {
        &self.store
    }

    /// Shared handle on the store.
    pub fn store_handle(&self) -> Arc<AtomSpace> {
        Arc::clone(&self.store)
    }

    /// Assert a ground term, creating missing atoms bottom-up.
    pub fn assert_term(&self, term: &Term) -> PatternResult<AtomId> {
        self.store.insert_term(term)
    }

    pub fn match_pattern(&self, pattern: &Pattern) -> PatternResult<Vec<MatchResult>> {
        self.matcher().match_pattern(pattern)
    }

    pub fn matcher(&self) -> PatternMatcher<'_, AtomSpace> {
        PatternMatcher::new(&self.store, self.config.matcher.clone())
    }

    pub fn composer(&self) -> PatternComposer<'_, AtomSpace> {
        PatternComposer::new(self.matcher())
    }

    pub fn temporal(&self) -> TemporalMatcher<'_, AtomSpace> {
        TemporalMatcher::new(self.matcher(), &self.config.temporal)
    }

    pub fn learner(&self) -> PatternResult<PatternLearner<'_, AtomSpace>> {
        PatternLearner::new(self.matcher(), self.config.learning.clone())
    }

    pub fn statistics(&self) -> PatternResult<StatisticalMatcher<'_, AtomSpace>> {
        StatisticalMatcher::new(self.matcher(), self.config.statistics.clone())
    }

    pub fn query(&self) -> QueryBuilder<'_, AtomSpace> {
        QueryBuilder::new(
            &self.store,
            self.config.matcher.clone(),
            self.config.statistics.clone(),
        )
    }
}

impl std::fmt::Debug for PatternEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternEngine")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish()
    }
}

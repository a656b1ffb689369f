//! Frequent-structure learning.
//!
//! Scans the store's links, groups them by a structural key, and turns each
//! sufficiently frequent and dominant group into a [`Pattern`] with fresh
//! variables in the varying positions:
//!
//! - inheritance links by shared target: `(Inheritance $x target)`
//! - evaluations by predicate and argument count: `(Evaluation pred (List $a0 ..))`
//! - any other link by type and arity: `(Type $v0 ..)`

use std::collections::{BTreeMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::atom::{AtomId, AtomKind, AtomType};
use crate::config::LearningConfig;
use crate::error::{LearnError, PatternResult};
use crate::matcher::PatternMatcher;
use crate::pattern::{MatchResult, Pattern, Term};
use crate::store::AtomStore;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which grouping produced a learned pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LearnedKind {
    Inheritance,
    Predicate,
    Structural,
}

/// A pattern synthesized from a frequent group of links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub pattern: Pattern,
    pub kind: LearnedKind,
    /// Group size over the number of links of the same kind.
    pub frequency: f32,
    /// Dominance of the group within its kind.
    pub confidence: f32,
    pub examples: Vec<MatchResult>,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Inheritance { target: AtomId },
    Predicate { predicate: AtomId, arity: usize },
    Structural { atom_type: AtomType, arity: usize },
}

impl GroupKey {
    fn kind(&self) -> LearnedKind {
        match self {
            Self::Inheritance { .. } => LearnedKind::Inheritance,
            Self::Predicate { .. } => LearnedKind::Predicate,
            Self::Structural { .. } => LearnedKind::Structural,
        }
    }
}

// ---------------------------------------------------------------------------
// Learner
// ---------------------------------------------------------------------------

pub struct PatternLearner<'s, S: AtomStore + ?Sized> {
    matcher: PatternMatcher<'s, S>,
    config: LearningConfig,
    learned: Vec<LearnedPattern>,
}

impl<'s, S: AtomStore + ?Sized> PatternLearner<'s, S> {
    pub fn new(matcher: PatternMatcher<'s, S>, config: LearningConfig) -> PatternResult<Self> {
        validate_threshold("frequency", config.frequency_threshold)?;
        validate_threshold("confidence", config.confidence_threshold)?;
        Ok(Self {
            matcher,
            config,
            learned: Vec::new(),
        })
    }

    pub fn learned(&self) -> &[LearnedPattern] {
        &self.learned
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Change both thresholds. Already learned patterns are kept and
    /// filtered again by [`apply_learned_patterns`](Self::apply_learned_patterns).
    pub fn set_thresholds(&mut self, frequency: f32, confidence: f32) -> PatternResult<()> {
        validate_threshold("frequency", frequency)?;
        validate_threshold("confidence", confidence)?;
        self.config.frequency_threshold = frequency;
        self.config.confidence_threshold = confidence;
        Ok(())
    }

    /// Scan the store and replace the learned set.
    pub fn learn_patterns(&mut self) -> PatternResult<Vec<LearnedPattern>> {
        let groups = self.group_links();

        let mut totals: BTreeMap<LearnedKind, usize> = BTreeMap::new();
        let mut largest: BTreeMap<LearnedKind, usize> = BTreeMap::new();
        for (key, members) in &groups {
            let kind = key.kind();
            *totals.entry(kind).or_default() += members.len();
            let top = largest.entry(kind).or_default();
            *top = (*top).max(members.len());
        }

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut learned = Vec::new();
        for (key, members) in &groups {
            let kind = key.kind();
            let size = members.len() as f32;
            let total = totals.get(&kind).copied().unwrap_or(0).max(1) as f32;
            let top = largest.get(&kind).copied().unwrap_or(0).max(1) as f32;

            let frequency = size / total;
            let confidence = (size / top) * (size / (size + 1.0));
            if frequency < self.config.frequency_threshold
                || confidence < self.config.confidence_threshold
            {
                continue;
            }

            let Some(template) = self.synthesize(key) else {
                continue;
            };
            let pattern = Pattern::new(template);
            let mut examples = self.matcher.match_pattern(&pattern)?;
            examples.truncate(self.config.max_examples);

            tracing::debug!(
                pattern = %pattern,
                ?kind,
                frequency,
                confidence,
                "learned pattern"
            );
            learned.push(LearnedPattern {
                pattern,
                kind,
                frequency,
                confidence,
                examples,
                created_at,
            });
        }

        tracing::info!(
            groups = groups.len(),
            learned = learned.len(),
            "pattern learning complete"
        );
        self.learned = learned.clone();
        Ok(learned)
    }

    /// Re-run every learned pattern meeting both thresholds and union the
    /// results, deduplicated by template and binding signature.
    pub fn apply_learned_patterns(&self) -> PatternResult<Vec<MatchResult>> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for learned in &self.learned {
            if learned.frequency < self.config.frequency_threshold
                || learned.confidence < self.config.confidence_threshold
            {
                continue;
            }
            let template = learned.pattern.template().to_string();
            for result in self.matcher.match_pattern(&learned.pattern)? {
                if seen.insert((template.clone(), result.signature())) {
                    results.push(result);
                }
            }
        }
        Ok(results)
    }

    /// Bucket every link of the store under its structural key.
    fn group_links(&self) -> BTreeMap<GroupKey, Vec<AtomId>> {
        let store = self.matcher.store();
        let mut groups: BTreeMap<GroupKey, Vec<AtomId>> = BTreeMap::new();

        for atom_type in store.atom_types() {
            for id in store.atoms_by_type(&atom_type) {
                let Some(atom) = store.get(id) else {
                    continue;
                };
                let AtomKind::Structural { children } = &atom.kind else {
                    continue;
                };
                let key = match (&atom.atom_type, children.as_slice()) {
                    (AtomType::Inheritance, [_, target]) => GroupKey::Inheritance { target: *target },
                    (AtomType::Evaluation, [predicate, list]) => {
                        match (store.get(*predicate), store.get(*list)) {
                            (Some(p), Some(l))
                                if p.atom_type == AtomType::Predicate
                                    && l.atom_type == AtomType::List =>
                            {
                                GroupKey::Predicate {
                                    predicate: *predicate,
                                    arity: l.arity(),
                                }
                            }
                            _ => GroupKey::Structural {
                                atom_type: AtomType::Evaluation,
                                arity: 2,
                            },
                        }
                    }
                    (other, children) => GroupKey::Structural {
                        atom_type: other.clone(),
                        arity: children.len(),
                    },
                };
                groups.entry(key).or_default().push(id);
            }
        }
        groups
    }

    fn synthesize(&self, key: &GroupKey) -> Option<Term> {
        let store = self.matcher.store();
        match key {
            GroupKey::Inheritance { target } => Some(Term::inheritance(
                Term::variable("x"),
                store.to_term(*target)?,
            )),
            GroupKey::Predicate { predicate, arity } => Some(Term::evaluation(
                store.to_term(*predicate)?,
                (0..*arity).map(|i| Term::variable(&format!("a{i}"))).collect(),
            )),
            GroupKey::Structural { atom_type, arity } => Some(Term::link(
                atom_type.clone(),
                (0..*arity).map(|i| Term::variable(&format!("v{i}"))).collect(),
            )),
        }
    }
}

fn validate_threshold(name: &'static str, value: f32) -> PatternResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(LearnError::InvalidThreshold { name, value }.into())
    }
}

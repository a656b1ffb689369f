//! Temporal layer: timestamped matches, sequences and repetition.
//!
//! Every [`MatchResult`] is stamped with a time. If any of its matched atoms
//! has a recorded observation the latest such observation is used; otherwise
//! the result takes the next tick of a synthetic monotonic clock. Stamped
//! results are grouped per pattern into a [`TemporalMatch`] carrying the
//! spread (`duration`) and mean consecutive gap (`average_interval`) of its
//! timestamps.
//!
//! Sequences are cached by name together with the patterns they were built
//! from, and tagged with the store generation. A cached sequence is reused
//! only for identical patterns over an unchanged store.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::atom::AtomId;
use crate::config::TemporalConfig;
use crate::error::{PatternResult, TemporalError};
use crate::matcher::PatternMatcher;
use crate::pattern::{MatchResult, Pattern};
use crate::store::AtomStore;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Results of one pattern, each paired with its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalMatch {
    pub label: String,
    pub results: Vec<MatchResult>,
    /// `timestamps[i]` belongs to `results[i]`.
    pub timestamps: Vec<u64>,
    /// Latest minus earliest timestamp.
    pub duration: u64,
    /// Mean gap between consecutive sorted timestamps.
    pub average_interval: f64,
}

impl TemporalMatch {
    pub fn new(label: impl Into<String>, results: Vec<MatchResult>, timestamps: Vec<u64>) -> Self {
        let mut sorted = timestamps.clone();
        sorted.sort_unstable();
        let duration = match (sorted.first(), sorted.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        };
        let average_interval = if sorted.len() < 2 {
            0.0
        } else {
            let gaps: u64 = sorted.windows(2).map(|w| w[1] - w[0]).sum();
            gaps as f64 / (sorted.len() - 1) as f64
        };
        Self {
            label: label.into(),
            results,
            timestamps,
            duration,
            average_interval,
        }
    }

    /// Earliest timestamp, if any result was stamped.
    pub fn start(&self) -> Option<u64> {
        self.timestamps.iter().copied().min()
    }

    pub fn end(&self) -> Option<u64> {
        self.timestamps.iter().copied().max()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// One named run of patterns, one step per pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalSequence {
    pub name: String,
    pub steps: Vec<TemporalMatch>,
    /// Every step matched and each starts no earlier than the previous one.
    pub ordered: bool,
}

/// A template observed at least a threshold number of times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatingPattern {
    pub template: String,
    pub occurrences: usize,
    pub first_seen: u64,
    pub last_seen: u64,
}

/// One productive observation of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub template: String,
    pub timestamp: u64,
    pub matches: usize,
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

pub struct TemporalMatcher<'s, S: AtomStore + ?Sized> {
    matcher: PatternMatcher<'s, S>,
    observations: HashMap<AtomId, u64>,
    clock: u64,
    step: u64,
    history: Vec<HistoryEntry>,
    sequences: HashMap<String, CachedSequence>,
}

#[derive(Debug, Clone)]
struct CachedSequence {
    generation: u64,
    patterns: Vec<Pattern>,
    sequence: TemporalSequence,
}

impl<'s, S: AtomStore + ?Sized> TemporalMatcher<'s, S> {
    pub fn new(matcher: PatternMatcher<'s, S>, config: &TemporalConfig) -> Self {
        Self {
            matcher,
            observations: HashMap::new(),
            clock: config.synthetic_origin,
            step: config.synthetic_step.max(1),
            history: Vec::new(),
            sequences: HashMap::new(),
        }
    }

    /// Record that `atom` was observed at `timestamp`. Keeps the latest.
    pub fn record_observation(&mut self, atom: AtomId, timestamp: u64) {
        self.observations
            .entry(atom)
            .and_modify(|t| *t = (*t).max(timestamp))
            .or_insert(timestamp);
    }

    pub fn observation(&self, atom: AtomId) -> Option<u64> {
        self.observations.get(&atom).copied()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Match every pattern in order and stamp the results.
    pub fn match_sequence(
        &mut self,
        patterns: &[Pattern],
        name: &str,
    ) -> PatternResult<TemporalSequence> {
        if patterns.is_empty() {
            return Err(TemporalError::EmptySequence {
                name: name.to_string(),
            }
            .into());
        }

        let generation = self.matcher.store().generation();
        if let Some(cached) = self.sequences.get(name) {
            if cached.generation == generation && cached.patterns == patterns {
                return Ok(cached.sequence.clone());
            }
        }

        let mut steps = Vec::with_capacity(patterns.len());
        for (index, pattern) in patterns.iter().enumerate() {
            let step = self.timed_match(pattern, format!("{name}[{index}]"))?;
            self.observe(pattern, &step);
            steps.push(step);
        }

        let mut ordered = true;
        let mut previous: Option<u64> = None;
        for step in &steps {
            match (previous, step.start()) {
                (_, None) => ordered = false,
                (Some(prev), Some(start)) if start < prev => ordered = false,
                (_, Some(start)) => previous = Some(start),
            }
        }

        let sequence = TemporalSequence {
            name: name.to_string(),
            steps,
            ordered,
        };
        tracing::debug!(name, steps = sequence.steps.len(), ordered, "matched sequence");
        self.sequences.insert(
            name.to_string(),
            CachedSequence {
                generation,
                patterns: patterns.to_vec(),
                sequence: sequence.clone(),
            },
        );
        Ok(sequence)
    }

    /// Results whose timestamp falls within `[start, end]`.
    pub fn match_within_interval(
        &mut self,
        pattern: &Pattern,
        start: u64,
        end: u64,
    ) -> PatternResult<TemporalMatch> {
        if start > end {
            return Err(TemporalError::InvalidInterval { start, end }.into());
        }
        let all = self.timed_match(pattern, format!("{} @ [{start}, {end}]", pattern.template()))?;
        let (results, timestamps): (Vec<MatchResult>, Vec<u64>) = all
            .results
            .into_iter()
            .zip(all.timestamps)
            .filter(|(_, ts)| (start..=end).contains(ts))
            .unzip();
        let windowed = TemporalMatch::new(all.label, results, timestamps);
        self.observe(pattern, &windowed);
        Ok(windowed)
    }

    /// Templates observed at least `min_occurrences` times, most frequent first.
    pub fn detect_repeating_patterns(
        &self,
        min_occurrences: usize,
    ) -> PatternResult<Vec<RepeatingPattern>> {
        if min_occurrences == 0 {
            return Err(TemporalError::InvalidThreshold.into());
        }

        let mut grouped: BTreeMap<&str, RepeatingPattern> = BTreeMap::new();
        for entry in &self.history {
            grouped
                .entry(entry.template.as_str())
                .and_modify(|r| {
                    r.occurrences += 1;
                    r.first_seen = r.first_seen.min(entry.timestamp);
                    r.last_seen = r.last_seen.max(entry.timestamp);
                })
                .or_insert_with(|| RepeatingPattern {
                    template: entry.template.clone(),
                    occurrences: 1,
                    first_seen: entry.timestamp,
                    last_seen: entry.timestamp,
                });
        }

        let mut repeating: Vec<RepeatingPattern> = grouped
            .into_values()
            .filter(|r| r.occurrences >= min_occurrences)
            .collect();
        repeating.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        Ok(repeating)
    }

    fn timed_match(&mut self, pattern: &Pattern, label: String) -> PatternResult<TemporalMatch> {
        let results = self.matcher.match_pattern(pattern)?;
        let timestamps = results.iter().map(|r| self.timestamp_for(r)).collect();
        Ok(TemporalMatch::new(label, results, timestamps))
    }

    fn timestamp_for(&mut self, result: &MatchResult) -> u64 {
        let observed = result
            .matched_atoms()
            .iter()
            .filter_map(|id| self.observations.get(id))
            .max()
            .copied();
        observed.unwrap_or_else(|| {
            let tick = self.clock;
            self.clock = self.clock.saturating_add(self.step);
            tick
        })
    }

    fn observe(&mut self, pattern: &Pattern, matched: &TemporalMatch) {
        let Some(timestamp) = matched.start() else {
            return;
        };
        self.history.push(HistoryEntry {
            template: pattern.template().to_string(),
            timestamp,
            matches: matched.results.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatcherConfig;
    use crate::error::PatternError;
    use crate::pattern::Term;
    use crate::store::AtomSpace;

    fn space() -> AtomSpace {
        let space = AtomSpace::new();
        let dog = space.concept("dog").unwrap();
        let cat = space.concept("cat").unwrap();
        let mammal = space.concept("mammal").unwrap();
        let pet = space.concept("pet").unwrap();
        space.inheritance(dog, mammal).unwrap();
        space.inheritance(cat, mammal).unwrap();
        space.inheritance(dog, pet).unwrap();
        space
    }

    fn isa(target: &str) -> Pattern {
        Pattern::new(Term::inheritance(Term::variable("x"), Term::concept(target)))
    }

    fn temporal(space: &AtomSpace) -> TemporalMatcher<'_, AtomSpace> {
        let config = TemporalConfig {
            synthetic_origin: 100,
            synthetic_step: 10,
        };
        TemporalMatcher::new(PatternMatcher::new(space, MatcherConfig::default()), &config)
    }

    #[test]
    fn duration_and_interval_from_timestamps() {
        let m = TemporalMatch::new("x", Vec::new(), vec![30, 10, 20, 60]);
        assert_eq!(m.duration, 50);
        assert!((m.average_interval - 50.0 / 3.0).abs() < 1e-9);

        let single = TemporalMatch::new("y", Vec::new(), vec![5]);
        assert_eq!(single.duration, 0);
        assert_eq!(single.average_interval, 0.0);
    }

    #[test]
    fn sequence_uses_synthetic_clock() {
        let space = space();
        let mut t = temporal(&space);
        let seq = t.match_sequence(&[isa("mammal"), isa("pet")], "morning").unwrap();

        assert_eq!(seq.steps.len(), 2);
        assert_eq!(seq.steps[0].timestamps, vec![100, 110]);
        assert_eq!(seq.steps[0].duration, 10);
        assert_eq!(seq.steps[0].average_interval, 10.0);
        assert_eq!(seq.steps[1].timestamps, vec![120]);
        assert_eq!(seq.steps[1].label, "morning[1]");
        assert!(seq.ordered);
    }

    #[test]
    fn observations_override_clock_and_order() {
        let space = space();
        let mut t = temporal(&space);
        let dog_mammal = space
            .resolve(&Term::inheritance(Term::concept("dog"), Term::concept("mammal")))
            .unwrap();
        let cat_mammal = space
            .resolve(&Term::inheritance(Term::concept("cat"), Term::concept("mammal")))
            .unwrap();
        t.record_observation(dog_mammal, 500);
        t.record_observation(dog_mammal, 400);
        t.record_observation(cat_mammal, 600);
        assert_eq!(t.observation(dog_mammal), Some(500));

        // Pets (synthetic 100) start before mammals (500).
        let seq = t.match_sequence(&[isa("mammal"), isa("pet")], "s").unwrap();
        assert_eq!(seq.steps[0].timestamps, vec![500, 600]);
        assert_eq!(seq.steps[1].timestamps, vec![100]);
        assert!(!seq.ordered);
    }

    #[test]
    fn sequence_cache_follows_store_generation() {
        let space = space();
        let mut t = temporal(&space);
        let first = t.match_sequence(&[isa("pet")], "pets").unwrap();
        let again = t.match_sequence(&[isa("pet")], "pets").unwrap();
        assert_eq!(first, again);

        let cat = space.resolve(&Term::concept("cat")).unwrap();
        let pet = space.resolve(&Term::concept("pet")).unwrap();
        space.inheritance(cat, pet).unwrap();
        let fresh = t.match_sequence(&[isa("pet")], "pets").unwrap();
        assert_eq!(fresh.steps[0].results.len(), 2);
    }

    #[test]
    fn sequence_cache_distinguishes_patterns_under_one_name() {
        let space = space();
        let mut t = temporal(&space);
        let mammals = t.match_sequence(&[isa("mammal")], "s").unwrap();
        assert_eq!(mammals.steps[0].results.len(), 2);

        // Only dog is a pet.
        let pets = t.match_sequence(&[isa("pet")], "s").unwrap();
        assert_eq!(pets.steps[0].results.len(), 1);
        assert_eq!(
            pets.steps[0].results[0].get("$x"),
            space.resolve(&Term::concept("dog"))
        );
    }

    #[test]
    fn empty_sequence_rejected() {
        let space = space();
        let mut t = temporal(&space);
        assert!(matches!(
            t.match_sequence(&[], "nothing").unwrap_err(),
            PatternError::Temporal(TemporalError::EmptySequence { .. })
        ));
    }

    #[test]
    fn interval_filters_by_timestamp() {
        let space = space();
        let mut t = temporal(&space);
        // Stamps 100 and 110.
        let windowed = t.match_within_interval(&isa("mammal"), 105, 200).unwrap();
        assert_eq!(windowed.results.len(), 1);
        assert_eq!(windowed.timestamps, vec![110]);

        assert!(matches!(
            t.match_within_interval(&isa("mammal"), 10, 5).unwrap_err(),
            PatternError::Temporal(TemporalError::InvalidInterval { start: 10, end: 5 })
        ));
    }

    #[test]
    fn repeating_patterns_counted_from_history() {
        let space = space();
        let mut t = temporal(&space);
        t.match_sequence(&[isa("mammal"), isa("pet"), isa("mammal")], "a")
            .unwrap();
        t.match_within_interval(&isa("pet"), 0, u64::MAX).unwrap();
        t.match_within_interval(&isa("pet"), 0, 0).unwrap();

        let repeating = t.detect_repeating_patterns(2).unwrap();
        assert_eq!(repeating.len(), 2);
        assert!(repeating.iter().all(|r| r.occurrences == 2));
        assert!(repeating.iter().all(|r| r.first_seen <= r.last_seen));

        assert!(t.detect_repeating_patterns(3).unwrap().is_empty());
        assert!(t.detect_repeating_patterns(0).is_err());
    }
}

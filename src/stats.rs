//! Statistical layer: truth-value scoring, fuzzy relaxation, Bayesian
//! estimates and Monte Carlo sampling over match results.
//!
//! A result's probability is the mean of `(strength + confidence) / 2` over
//! its matched atoms; an atom with no truth value counts as 0.5.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand::{Rng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::atom::AtomId;
use crate::config::StatisticsConfig;
use crate::error::{PatternResult, StatsError};
use crate::matcher::PatternMatcher;
use crate::pattern::{MatchResult, Pattern};
use crate::store::AtomStore;

/// Probability assigned to an atom without a truth value.
pub const DEFAULT_PROBABILITY: f32 = 0.5;

/// A match result with a probability and an interval around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilisticMatch {
    pub result: MatchResult,
    pub probability: f32,
    pub confidence_interval: (f32, f32),
}

impl ProbabilisticMatch {
    fn new(result: MatchResult, probability: f32, mean_confidence: f32) -> Self {
        let probability = probability.clamp(0.0, 1.0);
        let half_width = (1.0 - mean_confidence) / 2.0;
        Self {
            result,
            probability,
            confidence_interval: (
                (probability - half_width).clamp(0.0, 1.0),
                (probability + half_width).clamp(0.0, 1.0),
            ),
        }
    }
}

/// Terms of Bayes' rule for a hypothesis given evidence patterns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BayesianEstimate {
    /// Hypothesis matches over store size.
    pub prior: f32,
    /// Share of evidence matches touching an atom a hypothesis match touched.
    pub likelihood: f32,
    /// Evidence matches over store size times evidence pattern count.
    pub evidence_probability: f32,
    /// `likelihood × prior / evidence_probability`, clamped to `[0, 1]`.
    pub posterior: f32,
}

pub struct StatisticalMatcher<'s, S: AtomStore + ?Sized> {
    matcher: PatternMatcher<'s, S>,
    config: StatisticsConfig,
    rng: StdRng,
}

impl<'s, S: AtomStore + ?Sized> StatisticalMatcher<'s, S> {
    pub fn new(matcher: PatternMatcher<'s, S>, config: StatisticsConfig) -> PatternResult<Self> {
        for (name, value) in [
            ("fuzzy_threshold", config.fuzzy_threshold),
            ("relaxation_penalty", config.relaxation_penalty),
            ("sampling_noise", config.sampling_noise),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(StatsError::InvalidParameter { name, value }.into());
            }
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            matcher,
            config,
            rng,
        })
    }

    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    /// Probability and mean confidence of one result.
    pub fn probability(&self, result: &MatchResult) -> (f32, f32) {
        let atoms = result.matched_atoms();
        if atoms.is_empty() {
            return (DEFAULT_PROBABILITY, 0.0);
        }
        let store = self.matcher.store();
        let (mut probability, mut confidence) = (0.0, 0.0);
        for id in atoms {
            match store.truth_value(*id) {
                Some(tv) => {
                    probability += tv.mean();
                    confidence += tv.confidence;
                }
                None => probability += DEFAULT_PROBABILITY,
            }
        }
        let n = atoms.len() as f32;
        (probability / n, confidence / n)
    }

    /// Exact matches scored by truth value, kept at or above the threshold.
    pub fn probabilistic_match(&self, pattern: &Pattern) -> PatternResult<Vec<ProbabilisticMatch>> {
        let results = self.matcher.match_pattern(pattern)?;
        let total = results.len();
        let kept: Vec<ProbabilisticMatch> = results
            .into_iter()
            .filter_map(|result| {
                let (p, c) = self.probability(&result);
                (p >= self.config.fuzzy_threshold).then(|| ProbabilisticMatch::new(result, p, c))
            })
            .collect();
        tracing::debug!(total, kept = kept.len(), "probabilistic match");
        Ok(kept)
    }

    /// Exact matches at 1.0 plus matches found by dropping one constraint.
    ///
    /// A relaxed match scores `probability × relaxation_penalty × similarity`,
    /// where similarity is the share of the original constraints it still
    /// satisfies. Output is deduplicated by binding signature and sorted by
    /// descending probability.
    pub fn fuzzy_match(&self, pattern: &Pattern) -> PatternResult<Vec<ProbabilisticMatch>> {
        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        for result in self.matcher.match_pattern(pattern)? {
            if seen.insert(result.signature()) {
                matches.push(ProbabilisticMatch::new(result, 1.0, 1.0));
            }
        }

        let constraints = pattern.constraints();
        let store = self.matcher.store();
        for index in 0..constraints.len() {
            let relaxed = pattern.without_constraint(index);
            for result in self.matcher.match_pattern(&relaxed)? {
                if seen.contains(&result.signature()) {
                    continue;
                }
                // A constraint that cannot be evaluated counts as violated.
                let satisfied = constraints
                    .iter()
                    .filter(|c| c.satisfied(result.bindings(), store).unwrap_or(false))
                    .count();
                let similarity = satisfied as f32 / constraints.len() as f32;
                let (p, c) = self.probability(&result);
                let score = p * self.config.relaxation_penalty * similarity;
                if score >= self.config.fuzzy_threshold {
                    seen.insert(result.signature());
                    matches.push(ProbabilisticMatch::new(result, score, c));
                }
            }
        }

        matches.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        tracing::debug!(results = matches.len(), "fuzzy match");
        Ok(matches)
    }

    /// Posterior of `hypothesis` given `evidence`.
    ///
    /// `None` when the prior or the evidence probability is zero.
    pub fn bayesian_inference(
        &self,
        evidence: &[Pattern],
        hypothesis: &Pattern,
    ) -> PatternResult<Option<BayesianEstimate>> {
        let store_size = self.matcher.store().len() as f32;
        if store_size == 0.0 {
            return Ok(None);
        }

        let hypothesis_matches = self.matcher.match_pattern(hypothesis)?;
        let prior = hypothesis_matches.len() as f32 / store_size;
        if prior == 0.0 {
            return Ok(None);
        }
        let hypothesis_atoms: HashSet<AtomId> = hypothesis_matches
            .iter()
            .flat_map(|r| r.matched_atoms().iter().copied())
            .collect();

        let mut evidence_matches = Vec::new();
        for pattern in evidence {
            evidence_matches.extend(self.matcher.match_pattern(pattern)?);
        }
        let evidence_probability =
            evidence_matches.len() as f32 / (store_size * evidence.len().max(1) as f32);
        if evidence_probability == 0.0 {
            return Ok(None);
        }

        let overlapping = evidence_matches
            .iter()
            .filter(|r| r.matched_atoms().iter().any(|a| hypothesis_atoms.contains(a)))
            .count();
        let likelihood = overlapping as f32 / evidence_matches.len() as f32;
        let posterior = (likelihood * prior / evidence_probability).clamp(0.0, 1.0);

        Ok(Some(BayesianEstimate {
            prior,
            likelihood,
            evidence_probability,
            posterior,
        }))
    }

    /// Sample results uniformly, perturb their probability with bounded noise
    /// and keep distinct samples at or above the threshold.
    pub fn monte_carlo_sampling(
        &mut self,
        pattern: &Pattern,
        num_samples: usize,
    ) -> PatternResult<Vec<ProbabilisticMatch>> {
        if num_samples == 0 {
            return Err(StatsError::NoSamples.into());
        }
        let results = self.matcher.match_pattern(pattern)?;
        let noise = self.config.sampling_noise;

        let mut seen = HashSet::new();
        let mut samples = Vec::new();
        for _ in 0..num_samples {
            let Some(result) = results.choose(&mut self.rng) else {
                break;
            };
            let (p, c) = self.probability(result);
            let perturbed = (p + self.rng.gen_range(-noise..=noise)).clamp(0.0, 1.0);
            if perturbed >= self.config.fuzzy_threshold && seen.insert(result.signature()) {
                samples.push(ProbabilisticMatch::new(result.clone(), perturbed, c));
            }
        }

        tracing::debug!(num_samples, kept = samples.len(), "monte carlo sampling");
        Ok(samples)
    }
}

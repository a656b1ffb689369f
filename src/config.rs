//! Engine configuration, persisted as TOML.
//!
//! One table per layer: `[matcher]`, `[temporal]`, `[learning]` and
//! `[statistics]`. Every field has a default, so an empty file is a valid
//! configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, PatternResult};

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Search bounds for the core matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Results beyond this count are dropped.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Wall-clock budget per match call; `None` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Cap on the type-diverse sample used for unconstrained variables.
    #[serde(default = "default_candidate_limit")]
    pub default_candidate_limit: usize,
}

fn default_max_results() -> usize {
    1000
}
fn default_candidate_limit() -> usize {
    1000
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            timeout_ms: None,
            default_candidate_limit: default_candidate_limit(),
        }
    }
}

impl MatcherConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Temporal
// ---------------------------------------------------------------------------

/// Synthetic clock used when no observation time is recorded for an atom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalConfig {
    #[serde(default)]
    pub synthetic_origin: u64,
    #[serde(default = "default_synthetic_step")]
    pub synthetic_step: u64,
}

fn default_synthetic_step() -> u64 {
    1
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            synthetic_origin: 0,
            synthetic_step: default_synthetic_step(),
        }
    }
}

// ---------------------------------------------------------------------------
// Learning
// ---------------------------------------------------------------------------

/// Thresholds for frequent-structure learning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Minimum share of its link kind a group must hold.
    #[serde(default = "default_frequency_threshold")]
    pub frequency_threshold: f32,
    /// Minimum dominance-based confidence.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// Example matches kept per learned pattern.
    #[serde(default = "default_max_examples")]
    pub max_examples: usize,
}

fn default_frequency_threshold() -> f32 {
    0.1
}
fn default_confidence_threshold() -> f32 {
    0.3
}
fn default_max_examples() -> usize {
    5
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            frequency_threshold: default_frequency_threshold(),
            confidence_threshold: default_confidence_threshold(),
            max_examples: default_max_examples(),
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Scoring parameters for probabilistic, fuzzy and sampled matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Results scoring below this are dropped.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f32,
    /// Multiplier applied to matches found by relaxing a constraint.
    #[serde(default = "default_relaxation_penalty")]
    pub relaxation_penalty: f32,
    /// Half-width of the uniform noise added by Monte Carlo sampling.
    #[serde(default = "default_sampling_noise")]
    pub sampling_noise: f32,
    /// Fixed RNG seed; `None` seeds from entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_fuzzy_threshold() -> f32 {
    0.5
}
fn default_relaxation_penalty() -> f32 {
    0.8
}
fn default_sampling_noise() -> f32 {
    0.1
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            relaxation_penalty: default_relaxation_penalty(),
            sampling_noise: default_sampling_noise(),
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Configuration for every layer of the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub temporal: TemporalConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

impl EngineConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> PatternResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml_str(content: &str) -> PatternResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> PatternResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }

    /// Reject values no layer can work with.
    pub fn validate(&self) -> PatternResult<()> {
        if self.matcher.default_candidate_limit == 0 {
            return Err(invalid("matcher.default_candidate_limit must be at least 1"));
        }
        if self.temporal.synthetic_step == 0 {
            return Err(invalid("temporal.synthetic_step must be at least 1"));
        }
        let unit_fields = [
            ("learning.frequency_threshold", self.learning.frequency_threshold),
            ("learning.confidence_threshold", self.learning.confidence_threshold),
            ("statistics.fuzzy_threshold", self.statistics.fuzzy_threshold),
            ("statistics.relaxation_penalty", self.statistics.relaxation_penalty),
            ("statistics.sampling_noise", self.statistics.sampling_noise),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(&format!("{name} must lie in [0, 1], got {value}")));
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> crate::error::PatternError {
    ConfigError::Invalid {
        message: message.to_string(),
    }
    .into()
}

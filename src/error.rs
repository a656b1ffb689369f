//! Rich diagnostic error types for the akh-match engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Everything funnels into [`PatternError`],
//! the common matching-error kind returned by the public API.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for pattern matching.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum PatternError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Temporal(#[from] TemporalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Learn(#[from] LearnError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("atom not found: {atom_id}")]
    #[diagnostic(
        code(akh::store::unknown_atom),
        help(
            "A link can only reference atoms that already exist in the store. \
             Add the child atoms first, then create the link."
        )
    )]
    UnknownAtom { atom_id: u64 },

    #[error("variable {name} cannot be stored as an atom")]
    #[diagnostic(
        code(akh::store::variable_not_storable),
        help(
            "Variables are template placeholders, not data. \
             Substitute a concrete atom before asserting the term."
        )
    )]
    VariableNotStorable { name: String },

    #[error("atom allocator exhausted")]
    #[diagnostic(
        code(akh::store::exhausted),
        help("The atom ID space is exhausted. Check for runaway atom creation.")
    )]
    AllocatorExhausted,
}

// ---------------------------------------------------------------------------
// Core matcher errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MatchError {
    #[error("pattern match timed out after {elapsed_ms} ms (limit {limit_ms} ms)")]
    #[diagnostic(
        code(akh::matcher::timeout),
        help(
            "The backtracking search exceeded its deadline and was aborted. \
             Increase `timeout_ms`, add type constraints to narrow candidates, \
             or switch to fuzzy matching."
        )
    )]
    Timeout { elapsed_ms: u64, limit_ms: u64 },

    #[error("constraint operand {term} is not numeric")]
    #[diagnostic(
        code(akh::matcher::non_numeric),
        help(
            "GreaterThan constraints compare leaf atoms whose names parse as numbers. \
             Restrict the variable to Number atoms with a type constraint."
        )
    )]
    NonNumeric { term: String },
}

// ---------------------------------------------------------------------------
// Composition errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ComposeError {
    #[error("unknown pattern: {name}")]
    #[diagnostic(
        code(akh::compose::unknown_pattern),
        help("Register the pattern with `PatternComposer::register()` before composing it.")
    )]
    UnknownPattern { name: String },

    #[error("{role} pattern not found: {name}")]
    #[diagnostic(
        code(akh::compose::missing_operand),
        help("Both the base and the exclude pattern of a NOT composition must be registered.")
    )]
    MissingOperand { role: &'static str, name: String },

    #[error("composition requires at least one pattern name")]
    #[diagnostic(
        code(akh::compose::empty),
        help("Pass one or more registered pattern names.")
    )]
    Empty,
}

// ---------------------------------------------------------------------------
// Temporal errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TemporalError {
    #[error("invalid interval: start {start} is after end {end}")]
    #[diagnostic(
        code(akh::temporal::invalid_interval),
        help("The interval start must not be later than its end.")
    )]
    InvalidInterval { start: u64, end: u64 },

    #[error("temporal sequence '{name}' has no patterns")]
    #[diagnostic(
        code(akh::temporal::empty_sequence),
        help("A sequence needs at least one pattern to match.")
    )]
    EmptySequence { name: String },

    #[error("minimum occurrences must be at least 1")]
    #[diagnostic(
        code(akh::temporal::invalid_threshold),
        help("Pass `min_occurrences >= 1` to detect repeating patterns.")
    )]
    InvalidThreshold,
}

// ---------------------------------------------------------------------------
// Learning errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LearnError {
    #[error("{name} threshold {value} is outside [0.0, 1.0]")]
    #[diagnostic(
        code(akh::learn::invalid_threshold),
        help("Frequency and confidence thresholds are ratios in [0.0, 1.0].")
    )]
    InvalidThreshold { name: &'static str, value: f32 },
}

// ---------------------------------------------------------------------------
// Statistical errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StatsError {
    #[error("{name} {value} is outside [0.0, 1.0]")]
    #[diagnostic(
        code(akh::stats::invalid_parameter),
        help("Probability thresholds, penalties and noise are ratios in [0.0, 1.0].")
    )]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("Monte Carlo sampling requires at least one sample")]
    #[diagnostic(
        code(akh::stats::no_samples),
        help("Pass `num_samples >= 1`.")
    )]
    NoSamples,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    #[diagnostic(
        code(akh::config::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(akh::config::parse),
        help("The config file must be valid TOML with [matcher], [temporal], [learning] and [statistics] tables.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config {path}")]
    #[diagnostic(
        code(akh::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(akh::config::invalid),
        help("Check the EngineConfig fields. {message}")
    )]
    Invalid { message: String },
}

/// Convenience alias for functions returning akh-match results.
pub type PatternResult<T> = std::result::Result<T, PatternError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_error_converts_to_pattern_error() {
        let err = MatchError::Timeout {
            elapsed_ms: 12,
            limit_ms: 10,
        };
        let top: PatternError = err.into();
        assert!(matches!(top, PatternError::Match(MatchError::Timeout { .. })));
    }

    #[test]
    fn compose_error_converts_to_pattern_error() {
        let err = ComposeError::UnknownPattern {
            name: "missing".into(),
        };
        let top: PatternError = err.into();
        assert!(matches!(
            top,
            PatternError::Compose(ComposeError::UnknownPattern { .. })
        ));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = ComposeError::MissingOperand {
            role: "exclude",
            name: "cats".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("exclude"));
        assert!(msg.contains("cats"));

        let err = TemporalError::InvalidInterval { start: 20, end: 10 };
        assert!(err.to_string().contains("20"));
    }
}

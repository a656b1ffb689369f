//! Export types for serializing match results.
//!
//! These types carry label-resolved copies of bindings and matched atoms so a
//! result set can be written as JSON without access to the store.

use serde::{Deserialize, Serialize};

use crate::pattern::MatchResult;
use crate::stats::ProbabilisticMatch;
use crate::store::AtomStore;

/// One variable binding with its resolved label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingExport {
    pub variable: String,
    pub atom_id: u64,
    pub label: String,
}

/// Exported match result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchExport {
    pub bindings: Vec<BindingExport>,
    /// Labels of the atoms matched per clause.
    pub matched: Vec<String>,
    /// Present for scored results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f32>,
}

impl MatchExport {
    pub fn from_result<S: AtomStore + ?Sized>(result: &MatchResult, store: &S) -> Self {
        Self {
            bindings: result
                .bindings()
                .iter()
                .map(|(variable, id)| BindingExport {
                    variable: variable.to_string(),
                    atom_id: id.get(),
                    label: store.label(id),
                })
                .collect(),
            matched: result
                .matched_atoms()
                .iter()
                .map(|id| store.label(*id))
                .collect(),
            probability: None,
        }
    }

    pub fn from_scored<S: AtomStore + ?Sized>(scored: &ProbabilisticMatch, store: &S) -> Self {
        Self {
            probability: Some(scored.probability),
            ..Self::from_result(&scored.result, store)
        }
    }
}

/// Serialize results as pretty-printed JSON.
pub fn export_matches_json<S: AtomStore + ?Sized>(
    results: &[MatchResult],
    store: &S,
) -> serde_json::Result<String> {
    let exported: Vec<MatchExport> = results
        .iter()
        .map(|r| MatchExport::from_result(r, store))
        .collect();
    serde_json::to_string_pretty(&exported)
}

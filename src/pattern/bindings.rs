//! Variable bindings and match results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::atom::AtomId;

/// Assignment of variables to atoms within one candidate.
///
/// Keys are unique and a variable binds to at most one atom. Ordering carries
/// no meaning; the map is ordered only so [`Bindings::signature`] is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bindings(BTreeMap<String, AtomId>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, variable: &str) -> Option<AtomId> {
        self.0.get(variable).copied()
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.0.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AtomId)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Bind `variable` to `atom`.
    ///
    /// Returns `false` (and leaves the map untouched) if the variable is
    /// already bound to a different atom.
    pub fn bind(&mut self, variable: &str, atom: AtomId) -> bool {
        match self.0.get(variable) {
            Some(existing) => *existing == atom,
            None => {
                self.0.insert(variable.to_string(), atom);
                true
            }
        }
    }

    /// Every variable bound in both maps resolves to the same atom.
    pub fn is_compatible(&self, other: &Bindings) -> bool {
        self.0
            .iter()
            .all(|(var, atom)| other.0.get(var).is_none_or(|o| o == atom))
    }

    /// At least one identical variable→atom pair occurs in both maps.
    pub fn shares_pair(&self, other: &Bindings) -> bool {
        self.0
            .iter()
            .any(|(var, atom)| other.0.get(var) == Some(atom))
    }

    /// Stable string form, used for deduplication and cache keys.
    pub fn signature(&self) -> String {
        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|(var, atom)| format!("{var}={atom}"))
            .collect();
        format!("{{{}}}", pairs.join(","))
    }
}

impl std::fmt::Display for Bindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.signature())
    }
}

impl FromIterator<(String, AtomId)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (String, AtomId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One accepted candidate: its bindings and the atoms matched per clause.
///
/// Created once at a leaf of the search tree and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    bindings: Bindings,
    matched_atoms: Vec<AtomId>,
}

impl MatchResult {
    pub fn new(bindings: Bindings, matched_atoms: Vec<AtomId>) -> Self {
        Self {
            bindings,
            matched_atoms,
        }
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn matched_atoms(&self) -> &[AtomId] {
        &self.matched_atoms
    }

    /// Atom bound to `variable`, if any.
    pub fn get(&self, variable: &str) -> Option<AtomId> {
        self.bindings.get(variable)
    }

    pub fn signature(&self) -> String {
        self.bindings.signature()
    }

    pub fn into_parts(self) -> (Bindings, Vec<AtomId>) {
        (self.bindings, self.matched_atoms)
    }
}

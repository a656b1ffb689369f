//! Atom store boundary.
//!
//! The matcher never owns atoms; it reads them through [`AtomStore`]. The
//! store is content-addressed: a leaf is unique by `(type, name)` and a link
//! by `(type, children)`, so resolving a ground [`Term`] yields at most one
//! handle. [`AtomSpace`] is the in-memory implementation.

pub mod atomspace;

use crate::atom::{Atom, AtomId, AtomKind, AtomType, TruthValue};
use crate::error::{PatternResult, StoreError};
use crate::pattern::Term;

pub use atomspace::AtomSpace;

/// Read and append access to a hypergraph of atoms.
pub trait AtomStore {
    /// Fetch an atom by handle.
    fn get(&self, id: AtomId) -> Option<Atom>;

    /// Find a leaf by type and name.
    fn find_node(&self, atom_type: &AtomType, name: &str) -> Option<AtomId>;

    /// Find a link by type and ordered children.
    fn find_link(&self, atom_type: &AtomType, children: &[AtomId]) -> Option<AtomId>;

    /// All atoms of exactly this type, in insertion order.
    fn atoms_by_type(&self, atom_type: &AtomType) -> Vec<AtomId>;

    /// Every type with at least one atom, sorted.
    fn atom_types(&self) -> Vec<AtomType>;

    /// Links that have `id` among their children, sorted by handle.
    fn incoming(&self, id: AtomId) -> Vec<AtomId>;

    /// Number of stored atoms.
    fn len(&self) -> usize;

    /// Counter bumped on every mutation; caches compare it to detect staleness.
    fn generation(&self) -> u64;

    /// Add (or find) a leaf atom.
    fn add_node(&self, atom_type: AtomType, name: &str) -> PatternResult<AtomId>;

    /// Add (or find) a link over existing atoms.
    fn add_link(&self, atom_type: AtomType, children: Vec<AtomId>) -> PatternResult<AtomId>;

    /// Replace an atom's truth value.
    fn set_truth(&self, id: AtomId, truth: TruthValue) -> PatternResult<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: AtomId) -> bool {
        self.get(id).is_some()
    }

    fn truth_value(&self, id: AtomId) -> Option<TruthValue> {
        self.get(id).and_then(|a| a.truth)
    }

    /// Handle of a ground term, or `None` if it is absent or contains variables.
    fn resolve(&self, term: &Term) -> Option<AtomId> {
        if term.is_variable() {
            return None;
        }
        match term {
            Term::Leaf { atom_type, name } => self.find_node(atom_type, name),
            Term::Link {
                atom_type,
                outgoing,
            } => {
                let children = outgoing
                    .iter()
                    .map(|child| self.resolve(child))
                    .collect::<Option<Vec<_>>>()?;
                self.find_link(atom_type, &children)
            }
        }
    }

    /// Rebuild the term describing a stored atom.
    fn to_term(&self, id: AtomId) -> Option<Term> {
        let atom = self.get(id)?;
        match atom.kind {
            AtomKind::Leaf { name } => Some(Term::leaf(atom.atom_type, name)),
            AtomKind::Structural { children } => {
                let outgoing = children
                    .iter()
                    .map(|child| self.to_term(*child))
                    .collect::<Option<Vec<_>>>()?;
                Some(Term::link(atom.atom_type, outgoing))
            }
        }
    }

    /// Assert a ground term, creating any missing atoms bottom-up.
    fn insert_term(&self, term: &Term) -> PatternResult<AtomId> {
        if let Some(name) = term.as_variable() {
            return Err(StoreError::VariableNotStorable {
                name: name.to_string(),
            }
            .into());
        }
        match term {
            Term::Leaf { atom_type, name } => self.add_node(atom_type.clone(), name),
            Term::Link {
                atom_type,
                outgoing,
            } => {
                let children = outgoing
                    .iter()
                    .map(|child| self.insert_term(child))
                    .collect::<PatternResult<Vec<_>>>()?;
                self.add_link(atom_type.clone(), children)
            }
        }
    }

    /// Human-readable rendering of an atom.
    fn label(&self, id: AtomId) -> String {
        self.to_term(id)
            .map(|t| t.to_string())
            .unwrap_or_else(|| id.to_string())
    }
}

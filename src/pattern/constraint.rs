//! Constraints restricting legal bindings.
//!
//! A constraint is a pure predicate over `(bindings, store)`. It is evaluated
//! repeatedly as bindings accumulate during search, so a constraint whose
//! terms still mention unbound variables is reported as satisfied until those
//! variables are bound.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::atom::AtomType;
use crate::error::{MatchError, PatternResult};
use crate::store::AtomStore;

use super::{Bindings, Term, variable_name};

/// Restriction on the bindings a pattern may produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// The variable must bind to an atom of one of these types.
    Type {
        variable: String,
        allowed: Vec<AtomType>,
    },
    /// Every term, after substitution, must be present in the store.
    Present(Vec<Term>),
    /// No term, after substitution, may be present in the store.
    Absent(Vec<Term>),
    /// Both sides substitute to the same atom.
    Equal { left: Term, right: Term },
    /// Both sides substitute to numeric leaves and `left > right`.
    GreaterThan { left: Term, right: Term },
}

impl Constraint {
    pub fn of_type(variable: &str, allowed: impl IntoIterator<Item = AtomType>) -> Self {
        Self::Type {
            variable: variable_name(variable),
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn present(terms: Vec<Term>) -> Self {
        Self::Present(terms)
    }

    pub fn absent(terms: Vec<Term>) -> Self {
        Self::Absent(terms)
    }

    pub fn equal(left: Term, right: Term) -> Self {
        Self::Equal { left, right }
    }

    pub fn greater_than(left: Term, right: Term) -> Self {
        Self::GreaterThan { left, right }
    }

    /// Variables this constraint mentions.
    pub fn variables(&self) -> BTreeSet<String> {
        match self {
            Self::Type { variable, .. } => BTreeSet::from([variable.clone()]),
            Self::Present(terms) | Self::Absent(terms) => {
                terms.iter().flat_map(Term::variable_names).collect()
            }
            Self::Equal { left, right } | Self::GreaterThan { left, right } => {
                let mut vars = left.variable_names();
                vars.extend(right.variable_names());
                vars
            }
        }
    }

    /// Evaluate against the current bindings.
    ///
    /// Errors (a non-numeric `GreaterThan` operand) are not recoverable and
    /// abort the enclosing match.
    pub fn satisfied<S: AtomStore + ?Sized>(
        &self,
        bindings: &Bindings,
        store: &S,
    ) -> PatternResult<bool> {
        match self {
            Self::Type { variable, allowed } => Ok(match bindings.get(variable) {
                None => true,
                Some(id) => store
                    .get(id)
                    .is_some_and(|atom| allowed.contains(&atom.atom_type)),
            }),

            Self::Present(terms) => {
                for term in terms {
                    if substitute(term, bindings, store)
                        .is_some_and(|ground| store.resolve(&ground).is_none())
                    {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            Self::Absent(terms) => {
                for term in terms {
                    if substitute(term, bindings, store)
                        .is_some_and(|ground| store.resolve(&ground).is_some())
                    {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            Self::Equal { left, right } => {
                match (
                    substitute(left, bindings, store),
                    substitute(right, bindings, store),
                ) {
                    // The store is content-addressed, so equal ground terms
                    // denote the same atom.
                    (Some(l), Some(r)) => Ok(l == r),
                    _ => Ok(true),
                }
            }

            Self::GreaterThan { left, right } => {
                match (
                    substitute(left, bindings, store),
                    substitute(right, bindings, store),
                ) {
                    (Some(l), Some(r)) => Ok(numeric_value(&l)? > numeric_value(&r)?),
                    _ => Ok(true),
                }
            }
        }
    }
}

/// Replace every bound variable in `term` by the term of its atom, recursing
/// into structural children.
///
/// Returns `None` while any variable is still unbound.
pub fn substitute<S: AtomStore + ?Sized>(
    term: &Term,
    bindings: &Bindings,
    store: &S,
) -> Option<Term> {
    if let Some(name) = term.as_variable() {
        let id = bindings.get(name)?;
        return store.to_term(id);
    }
    match term {
        Term::Leaf { .. } => Some(term.clone()),
        Term::Link {
            atom_type,
            outgoing,
        } => {
            let children = outgoing
                .iter()
                .map(|child| substitute(child, bindings, store))
                .collect::<Option<Vec<_>>>()?;
            Some(Term::link(atom_type.clone(), children))
        }
    }
}

fn numeric_value(term: &Term) -> PatternResult<f64> {
    match term {
        Term::Leaf { name, .. } => name.trim().parse::<f64>().map_err(|_| {
            MatchError::NonNumeric {
                term: term.to_string(),
            }
            .into()
        }),
        Term::Link { .. } => Err(MatchError::NonNumeric {
            term: term.to_string(),
        }
        .into()),
    }
}

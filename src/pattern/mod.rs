//! Pattern model: templates, variables and constraints.
//!
//! A [`Pattern`] is a template [`Term`] plus the set of [`Variable`]s it
//! contains plus an ordered list of [`Constraint`]s. Templates are plain
//! terms, not stored atoms; a variable is a `Variable`-typed leaf whose name
//! starts with [`VARIABLE_SIGIL`].

pub mod bindings;
pub mod constraint;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::atom::AtomType;

pub use bindings::{Bindings, MatchResult};
pub use constraint::Constraint;

/// Prefix that marks a `Variable`-typed leaf as a placeholder.
pub const VARIABLE_SIGIL: char = '$';

/// Normalize a variable name so it always carries the sigil.
pub fn variable_name(name: &str) -> String {
    if name.starts_with(VARIABLE_SIGIL) {
        name.to_string()
    } else {
        format!("{VARIABLE_SIGIL}{name}")
    }
}

// ---------------------------------------------------------------------------
// Terms
// ---------------------------------------------------------------------------

/// A template node: a typed leaf or a typed link over child terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// Terminal node identified by type and name.
    Leaf { atom_type: AtomType, name: String },
    /// Structural node with ordered children.
    Link {
        atom_type: AtomType,
        outgoing: Vec<Term>,
    },
}

impl Term {
    pub fn leaf(atom_type: AtomType, name: impl Into<String>) -> Self {
        Self::Leaf {
            atom_type,
            name: name.into(),
        }
    }

    pub fn link(atom_type: AtomType, outgoing: Vec<Term>) -> Self {
        Self::Link {
            atom_type,
            outgoing,
        }
    }

    pub fn concept(name: impl Into<String>) -> Self {
        Self::leaf(AtomType::Concept, name)
    }

    pub fn predicate(name: impl Into<String>) -> Self {
        Self::leaf(AtomType::Predicate, name)
    }

    pub fn number(value: f64) -> Self {
        Self::leaf(AtomType::Number, value.to_string())
    }

    /// A variable placeholder. The sigil is added if missing.
    pub fn variable(name: &str) -> Self {
        Self::leaf(AtomType::Variable, variable_name(name))
    }

    /// `child ISA parent`.
    pub fn inheritance(child: Term, parent: Term) -> Self {
        Self::link(AtomType::Inheritance, vec![child, parent])
    }

    /// `predicate(arguments)`, with the arguments wrapped in a `List`.
    pub fn evaluation(predicate: Term, arguments: Vec<Term>) -> Self {
        Self::link(
            AtomType::Evaluation,
            vec![predicate, Self::link(AtomType::List, arguments)],
        )
    }

    /// Conjunction of clauses.
    pub fn and(clauses: Vec<Term>) -> Self {
        Self::link(AtomType::And, clauses)
    }

    pub fn atom_type(&self) -> &AtomType {
        match self {
            Self::Leaf { atom_type, .. } | Self::Link { atom_type, .. } => atom_type,
        }
    }

    /// Number of children (0 for leaves).
    pub fn arity(&self) -> usize {
        match self {
            Self::Leaf { .. } => 0,
            Self::Link { outgoing, .. } => outgoing.len(),
        }
    }

    /// The variable name if this term is a variable.
    ///
    /// Recognition is syntactic: the leaf must carry exactly the `Variable`
    /// type tag *and* a sigil-prefixed, non-empty name. A concept that happens
    /// to be named `$x` is not a variable.
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::Leaf {
                atom_type: AtomType::Variable,
                name,
            } if name.len() > VARIABLE_SIGIL.len_utf8() && name.starts_with(VARIABLE_SIGIL) => {
                Some(name)
            }
            _ => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.as_variable().is_some()
    }

    /// Whether the term contains no variables at any depth.
    pub fn is_ground(&self) -> bool {
        match self {
            Self::Leaf { .. } => !self.is_variable(),
            Self::Link { outgoing, .. } => outgoing.iter().all(Term::is_ground),
        }
    }

    /// All variable names reachable by recursive descent.
    pub fn variable_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::Leaf { .. } => {
                if let Some(name) = self.as_variable() {
                    names.insert(name.to_string());
                }
            }
            Self::Link { outgoing, .. } => {
                for child in outgoing {
                    child.collect_variables(names);
                }
            }
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = self.as_variable() {
            return write!(f, "{name}");
        }
        match self {
            Self::Leaf { atom_type, name } => write!(f, "({atom_type} {name:?})"),
            Self::Link {
                atom_type,
                outgoing,
            } => {
                write!(f, "({atom_type}")?;
                for child in outgoing {
                    write!(f, " {child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// A placeholder occurring in a template, with an optional required type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub required_type: Option<AtomType>,
}

impl Variable {
    pub fn new(name: &str) -> Self {
        Self {
            name: variable_name(name),
            required_type: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// A template plus its variables plus the constraints on legal bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    template: Term,
    variables: BTreeSet<Variable>,
    constraints: Vec<Constraint>,
}

impl Pattern {
    /// Build a pattern; variables are extracted from the template at any depth.
    pub fn new(template: Term) -> Self {
        let variables = template
            .variable_names()
            .into_iter()
            .map(|name| Variable {
                name,
                required_type: None,
            })
            .collect();
        Self {
            template,
            variables,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Declare the required type of a variable occurring in the template.
    ///
    /// Names that do not occur in the template are ignored so the variable
    /// set keeps mirroring the template.
    pub fn with_variable_type(mut self, name: &str, required_type: AtomType) -> Self {
        let name = variable_name(name);
        let existing = self.variables.iter().find(|v| v.name == name).cloned();
        if let Some(var) = existing {
            self.variables.remove(&var);
            self.variables.insert(Variable {
                name,
                required_type: Some(required_type),
            });
        }
        self
    }

    pub fn template(&self) -> &Term {
        &self.template
    }

    pub fn variables(&self) -> &BTreeSet<Variable> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The clauses the matcher must find in the store.
    ///
    /// An `And` root is a conjunction of its children; any other template is
    /// a single clause.
    pub fn clauses(&self) -> Vec<&Term> {
        match &self.template {
            Term::Link {
                atom_type: AtomType::And,
                outgoing,
            } => outgoing.iter().collect(),
            other => vec![other],
        }
    }

    /// Types a variable may bind to, or `None` when unrestricted.
    ///
    /// Intersects the variable's required type with every type constraint
    /// targeting it.
    pub fn allowed_types(&self, name: &str) -> Option<Vec<AtomType>> {
        let mut allowed: Option<Vec<AtomType>> = self
            .variable(name)
            .and_then(|v| v.required_type.clone())
            .map(|ty| vec![ty]);

        for constraint in &self.constraints {
            if let Constraint::Type {
                variable,
                allowed: types,
            } = constraint
            {
                if variable != name {
                    continue;
                }
                allowed = Some(match allowed {
                    None => types.clone(),
                    Some(current) => current.into_iter().filter(|t| types.contains(t)).collect(),
                });
            }
        }

        allowed
    }

    /// A copy of this pattern with the constraint at `index` removed.
    pub fn without_constraint(&self, index: usize) -> Pattern {
        let mut relaxed = self.clone();
        if index < relaxed.constraints.len() {
            relaxed.constraints.remove(index);
        }
        relaxed
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.template)?;
        if !self.constraints.is_empty() {
            write!(f, " where {} constraint(s)", self.constraints.len())?;
        }
        Ok(())
    }
}

//! Core atom types for the hypergraph store.
//!
//! Atoms are the graph elements the matcher searches over. Every atom is
//! identified by an [`AtomId`] handle assigned by the store, carries an
//! [`AtomType`] tag from an open type system, and is either a leaf (a named
//! terminal) or a structural node with an ordered list of children. The
//! [`AtomIdAllocator`] provides thread-safe handle generation.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{PatternResult, StoreError};

/// Unique, niche-optimized handle for a stored atom.
///
/// Atom equality is identity: two atoms are the same atom iff their handles
/// are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AtomId(NonZeroU64);

impl AtomId {
    /// Create an `AtomId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(AtomId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for AtomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "atom:{}", self.0)
    }
}

/// Type tag of an atom.
///
/// The well-known tags cover the relational shapes the learning layer
/// understands; anything else goes through [`AtomType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AtomType {
    /// A named concept ("dog", "animal").
    Concept,
    /// A named predicate used in evaluation links.
    Predicate,
    /// A numeric leaf; its name parses as a number.
    Number,
    /// Template placeholder. Never stored.
    Variable,
    /// Ordered argument list.
    List,
    /// `child ISA parent`.
    Inheritance,
    /// `predicate(arguments)`.
    Evaluation,
    /// Symmetric similarity between two atoms.
    Similarity,
    /// Set membership.
    Member,
    /// Conjunction. As a template root it splits into independent clauses.
    And,
    /// Any type outside the well-known set.
    Custom(String),
}

impl AtomType {
    /// Parse a type tag from its display name. Unknown names become `Custom`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "concept" | "conceptnode" => Self::Concept,
            "predicate" | "predicatenode" => Self::Predicate,
            "number" | "numbernode" => Self::Number,
            "variable" | "variablenode" => Self::Variable,
            "list" | "listlink" => Self::List,
            "inheritance" | "inheritancelink" => Self::Inheritance,
            "evaluation" | "evaluationlink" => Self::Evaluation,
            "similarity" | "similaritylink" => Self::Similarity,
            "member" | "memberlink" => Self::Member,
            "and" | "andlink" => Self::And,
            _ => Self::Custom(s.trim().to_string()),
        }
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomType::Concept => write!(f, "Concept"),
            AtomType::Predicate => write!(f, "Predicate"),
            AtomType::Number => write!(f, "Number"),
            AtomType::Variable => write!(f, "Variable"),
            AtomType::List => write!(f, "List"),
            AtomType::Inheritance => write!(f, "Inheritance"),
            AtomType::Evaluation => write!(f, "Evaluation"),
            AtomType::Similarity => write!(f, "Similarity"),
            AtomType::Member => write!(f, "Member"),
            AtomType::And => write!(f, "And"),
            AtomType::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// Degree and certainty of an atom's assertion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthValue {
    /// Degree of truth in [0.0, 1.0].
    pub strength: f32,
    /// Certainty about the strength in [0.0, 1.0].
    pub confidence: f32,
}

impl TruthValue {
    /// Create a truth value, clamping both components to [0.0, 1.0].
    pub fn new(strength: f32, confidence: f32) -> Self {
        Self {
            strength: strength.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Mean of strength and confidence, the basis for match probabilities.
    pub fn mean(&self) -> f32 {
        (self.strength + self.confidence) / 2.0
    }
}

/// Leaf-or-structural shape of an atom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtomKind {
    /// Terminal atom carrying a name or value.
    Leaf { name: String },
    /// Node with an ordered, fixed-at-creation list of children.
    Structural { children: Vec<AtomId> },
}

/// A stored graph element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// Store-assigned handle.
    pub id: AtomId,
    /// Type tag.
    pub atom_type: AtomType,
    /// Leaf name or ordered children.
    pub kind: AtomKind,
    /// Optional truth value.
    pub truth: Option<TruthValue>,
}

impl Atom {
    /// Create a leaf atom.
    pub fn leaf(id: AtomId, atom_type: AtomType, name: impl Into<String>) -> Self {
        Self {
            id,
            atom_type,
            kind: AtomKind::Leaf { name: name.into() },
            truth: None,
        }
    }

    /// Create a structural atom.
    pub fn structural(id: AtomId, atom_type: AtomType, children: Vec<AtomId>) -> Self {
        Self {
            id,
            atom_type,
            kind: AtomKind::Structural { children },
            truth: None,
        }
    }

    /// Attach a truth value.
    pub fn with_truth(mut self, truth: TruthValue) -> Self {
        self.truth = Some(truth);
        self
    }

    /// Leaf name, or `None` for structural atoms.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            AtomKind::Leaf { name } => Some(name),
            AtomKind::Structural { .. } => None,
        }
    }

    /// Ordered children; empty for leaves.
    pub fn children(&self) -> &[AtomId] {
        match &self.kind {
            AtomKind::Leaf { .. } => &[],
            AtomKind::Structural { children } => children,
        }
    }

    /// Number of children (0 for leaves).
    pub fn arity(&self) -> usize {
        self.children().len()
    }

    /// Whether this atom is structural.
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, AtomKind::Structural { .. })
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Atom {}

/// Thread-safe atom handle allocator.
///
/// Produces monotonically increasing IDs starting from 1.
#[derive(Debug)]
pub struct AtomIdAllocator {
    next: AtomicU64,
}

impl AtomIdAllocator {
    /// Create a new allocator that starts from ID 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next atom ID.
    pub fn next_id(&self) -> PatternResult<AtomId> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        AtomId::new(raw).ok_or_else(|| StoreError::AllocatorExhausted.into())
    }
}

impl Default for AtomIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

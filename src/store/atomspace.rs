//! In-memory atom store with content, type and incoming-set indices.
//!
//! Uses `DashMap` for lookups by handle, content and type, and a `petgraph`
//! digraph (link → child edges) for incoming-set queries.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::atom::{Atom, AtomId, AtomIdAllocator, AtomType, TruthValue};
use crate::error::{PatternResult, StoreError};
use crate::pattern::Term;

use super::AtomStore;

/// Content key: what makes two atoms the same atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum AtomKey {
    Leaf(AtomType, String),
    Link(AtomType, Vec<AtomId>),
}

/// Content-addressed in-memory hypergraph.
pub struct AtomSpace {
    atoms: DashMap<AtomId, Atom>,
    /// Content → handle, enforcing uniqueness.
    content_index: DashMap<AtomKey, AtomId>,
    /// Type → handles in insertion order.
    type_index: DashMap<AtomType, Vec<AtomId>>,
    /// Link → child edges; edge weight is the child position.
    graph: RwLock<DiGraph<AtomId, usize>>,
    node_index: DashMap<AtomId, NodeIndex>,
    allocator: AtomIdAllocator,
    generation: AtomicU64,
}

impl AtomSpace {
    pub fn new() -> Self {
        Self {
            atoms: DashMap::new(),
            content_index: DashMap::new(),
            type_index: DashMap::new(),
            graph: RwLock::new(DiGraph::new()),
            node_index: DashMap::new(),
            allocator: AtomIdAllocator::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Add a `Concept` leaf.
    pub fn concept(&self, name: &str) -> PatternResult<AtomId> {
        self.add_node(AtomType::Concept, name)
    }

    /// Add a `Predicate` leaf.
    pub fn predicate(&self, name: &str) -> PatternResult<AtomId> {
        self.add_node(AtomType::Predicate, name)
    }

    /// Add a `Number` leaf.
    pub fn number(&self, value: f64) -> PatternResult<AtomId> {
        self.add_node(AtomType::Number, &value.to_string())
    }

    /// Add `child ISA parent`.
    pub fn inheritance(&self, child: AtomId, parent: AtomId) -> PatternResult<AtomId> {
        self.add_link(AtomType::Inheritance, vec![child, parent])
    }

    /// Add `predicate(arguments)`, wrapping the arguments in a `List`.
    pub fn evaluation(&self, predicate: AtomId, arguments: Vec<AtomId>) -> PatternResult<AtomId> {
        let list = self.add_link(AtomType::List, arguments)?;
        self.add_link(AtomType::Evaluation, vec![predicate, list])
    }

    /// Insert a brand-new atom whose content key is vacant.
    fn create(&self, atom: Atom) {
        let id = atom.id;
        let children = atom.children().to_vec();
        {
            let mut graph = self.graph.write().expect("graph lock poisoned");
            let idx = graph.add_node(id);
            self.node_index.insert(id, idx);
            for (position, child) in children.iter().enumerate() {
                if let Some(child_idx) = self.node_index.get(child).map(|e| *e.value()) {
                    graph.add_edge(idx, child_idx, position);
                }
            }
        }
        self.type_index
            .entry(atom.atom_type.clone())
            .or_default()
            .push(id);
        self.atoms.insert(id, atom);
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    /// Every stored atom handle, sorted.
    pub fn all_atoms(&self) -> Vec<AtomId> {
        let mut ids: Vec<AtomId> = self.atoms.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }
}

impl AtomStore for AtomSpace {
    fn get(&self, id: AtomId) -> Option<Atom> {
        self.atoms.get(&id).map(|e| e.value().clone())
    }

    fn contains(&self, id: AtomId) -> bool {
        self.atoms.contains_key(&id)
    }

    fn find_node(&self, atom_type: &AtomType, name: &str) -> Option<AtomId> {
        self.content_index
            .get(&AtomKey::Leaf(atom_type.clone(), name.to_string()))
            .map(|e| *e.value())
    }

    fn find_link(&self, atom_type: &AtomType, children: &[AtomId]) -> Option<AtomId> {
        self.content_index
            .get(&AtomKey::Link(atom_type.clone(), children.to_vec()))
            .map(|e| *e.value())
    }

    fn atoms_by_type(&self, atom_type: &AtomType) -> Vec<AtomId> {
        self.type_index
            .get(atom_type)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    fn atom_types(&self) -> Vec<AtomType> {
        let mut types: Vec<AtomType> = self.type_index.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    fn incoming(&self, id: AtomId) -> Vec<AtomId> {
        let Some(idx) = self.node_index.get(&id).map(|e| *e.value()) else {
            return Vec::new();
        };
        let graph = self.graph.read().expect("graph lock poisoned");
        let mut links: Vec<AtomId> = graph
            .edges_directed(idx, Direction::Incoming)
            .filter_map(|e| graph.node_weight(e.source()).copied())
            .collect();
        links.sort();
        links.dedup();
        links
    }

    fn len(&self) -> usize {
        self.atoms.len()
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    fn add_node(&self, atom_type: AtomType, name: &str) -> PatternResult<AtomId> {
        if atom_type == AtomType::Variable {
            return Err(StoreError::VariableNotStorable {
                name: name.to_string(),
            }
            .into());
        }
        match self
            .content_index
            .entry(AtomKey::Leaf(atom_type.clone(), name.to_string()))
        {
            Entry::Occupied(e) => Ok(*e.get()),
            Entry::Vacant(v) => {
                let id = self.allocator.next_id()?;
                v.insert(id);
                self.create(Atom::leaf(id, atom_type, name));
                Ok(id)
            }
        }
    }

    fn add_link(&self, atom_type: AtomType, children: Vec<AtomId>) -> PatternResult<AtomId> {
        if atom_type == AtomType::Variable {
            return Err(StoreError::VariableNotStorable {
                name: atom_type.to_string(),
            }
            .into());
        }
        if let Some(missing) = children.iter().find(|c| !self.atoms.contains_key(*c)) {
            return Err(StoreError::UnknownAtom {
                atom_id: missing.get(),
            }
            .into());
        }
        match self
            .content_index
            .entry(AtomKey::Link(atom_type.clone(), children.clone()))
        {
            Entry::Occupied(e) => Ok(*e.get()),
            Entry::Vacant(v) => {
                let id = self.allocator.next_id()?;
                v.insert(id);
                self.create(Atom::structural(id, atom_type, children));
                Ok(id)
            }
        }
    }

    fn set_truth(&self, id: AtomId, truth: TruthValue) -> PatternResult<()> {
        let mut atom = self
            .atoms
            .get_mut(&id)
            .ok_or(StoreError::UnknownAtom { atom_id: id.get() })?;
        atom.truth = Some(truth);
        drop(atom);
        self.generation.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Default for AtomSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AtomSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomSpace")
            .field("atoms", &self.len())
            .field("types", &self.type_index.len())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Build a space from ground terms. Handy for tests and fixtures.
impl TryFrom<&[Term]> for AtomSpace {
    type Error = crate::error::PatternError;

    fn try_from(terms: &[Term]) -> PatternResult<Self> {
        let space = AtomSpace::new();
        for term in terms {
            space.insert_term(term)?;
        }
        Ok(space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_are_content_addressed() {
        let space = AtomSpace::new();
        let a = space.concept("dog").unwrap();
        let b = space.concept("dog").unwrap();
        let c = space.predicate("dog").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(space.len(), 2);
    }

    #[test]
    fn links_are_content_addressed() {
        let space = AtomSpace::new();
        let dog = space.concept("dog").unwrap();
        let animal = space.concept("animal").unwrap();
        let l1 = space.inheritance(dog, animal).unwrap();
        let l2 = space.inheritance(dog, animal).unwrap();
        let l3 = space.inheritance(animal, dog).unwrap();
        assert_eq!(l1, l2);
        assert_ne!(l1, l3);
        assert_eq!(space.find_link(&AtomType::Inheritance, &[dog, animal]), Some(l1));
    }

    #[test]
    fn link_over_unknown_atom_fails() {
        let space = AtomSpace::new();
        let dog = space.concept("dog").unwrap();
        let ghost = AtomId::new(999).unwrap();
        let err = space.add_link(AtomType::Inheritance, vec![dog, ghost]);
        assert!(err.is_err());
    }

    #[test]
    fn variables_cannot_be_stored() {
        let space = AtomSpace::new();
        assert!(space.add_node(AtomType::Variable, "$x").is_err());
        assert!(space.insert_term(&Term::variable("x")).is_err());
        assert!(
            space
                .insert_term(&Term::inheritance(Term::variable("x"), Term::concept("a")))
                .is_err()
        );
    }

    #[test]
    fn type_index_and_types() {
        let space = AtomSpace::new();
        let dog = space.concept("dog").unwrap();
        let cat = space.concept("cat").unwrap();
        let animal = space.concept("animal").unwrap();
        space.inheritance(dog, animal).unwrap();
        assert_eq!(space.atoms_by_type(&AtomType::Concept), vec![dog, cat, animal]);
        assert_eq!(space.atoms_by_type(&AtomType::Inheritance).len(), 1);
        assert_eq!(
            space.atom_types(),
            vec![AtomType::Concept, AtomType::Inheritance]
        );
    }

    #[test]
    fn incoming_set() {
        let space = AtomSpace::new();
        let dog = space.concept("dog").unwrap();
        let cat = space.concept("cat").unwrap();
        let animal = space.concept("animal").unwrap();
        let l1 = space.inheritance(dog, animal).unwrap();
        let l2 = space.inheritance(cat, animal).unwrap();
        let sim = space
            .add_link(AtomType::Similarity, vec![dog, dog])
            .unwrap();
        assert_eq!(space.incoming(animal), vec![l1, l2]);
        assert_eq!(space.incoming(dog), vec![l1, sim]);
        assert!(space.incoming(l1).is_empty());
    }

    #[test]
    fn resolve_and_to_term_round_trip() {
        let space = AtomSpace::new();
        let term = Term::evaluation(
            Term::predicate("likes"),
            vec![Term::concept("alice"), Term::concept("bob")],
        );
        let id = space.insert_term(&term).unwrap();
        assert_eq!(space.resolve(&term), Some(id));
        assert_eq!(space.to_term(id), Some(term));
        assert_eq!(space.resolve(&Term::concept("carol")), None);
    }

    #[test]
    fn generation_bumps_on_mutation() {
        let space = AtomSpace::new();
        let g0 = space.generation();
        let dog = space.concept("dog").unwrap();
        let g1 = space.generation();
        assert!(g1 > g0);
        space.concept("dog").unwrap();
        assert_eq!(space.generation(), g1);
        space.set_truth(dog, TruthValue::new(0.9, 0.8)).unwrap();
        assert!(space.generation() > g1);
        assert_eq!(space.truth_value(dog), Some(TruthValue::new(0.9, 0.8)));
    }
}

//! Environment
//!
//! The mapping from relation name to relation that queries evaluate
//! against. It is the only mutable state in the system, and it is only
//! ever mutated by the driver between queries - evaluation takes it by
//! shared reference.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Relation;

/// Named relations for a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    relations: BTreeMap<String, Relation>,
}

impl Environment {
    /// Create an empty environment
    pub fn new() -> Self {
        Environment {
            relations: BTreeMap::new(),
        }
    }

    /// Bind a name to a relation, replacing any previous binding
    pub fn bind(&mut self, name: impl Into<String>, relation: Relation) {
        self.relations.insert(name.into(), relation);
    }

    /// Look up a relation by name
    pub fn get(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// Check whether a name is bound
    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Remove a binding, returning the relation if it existed
    pub fn remove(&mut self, name: &str) -> Option<Relation> {
        self.relations.remove(name)
    }

    /// Bound names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.relations.keys()
    }

    /// Iterate (name, relation) pairs in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Relation)> {
        self.relations.iter()
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Check if no names are bound
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

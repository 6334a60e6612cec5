//! Policy graph store.
//!
//! Nodes plus two edge relations: containment ("assignment", child -> parents)
//! and permission ("association", user attribute -> attribute with an
//! operation set). Every mutation checks the kind tables in [`crate::types`]
//! and leaves the store untouched when it fails.

pub mod memory;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::types::{Kind, Node, Operations, Properties};

pub use memory::MemoryGraph;

/// Child name -> parent names.
pub type Assignments = BTreeMap<String, BTreeSet<String>>;

/// Target name -> granted operations, for one subject.
pub type SubjectAssociations = BTreeMap<String, Operations>;

/// Subject name -> its associations.
pub type Associations = BTreeMap<String, SubjectAssociations>;

/// Storage contract for the policy graph.
///
/// Read methods hand back owned copies; nothing returned here aliases
/// store-internal state.
pub trait PolicyGraph {
    /// Create a parentless policy class node.
    fn create_policy_class(&mut self, name: &str) -> Result<Node>;

    /// Create a node assigned to every name in `parents` (at least one).
    fn create_node(
        &mut self,
        name: &str,
        kind: Kind,
        properties: Properties,
        parents: &[&str],
    ) -> Result<Node>;

    /// Replace a node's properties wholesale.
    fn update_node(&mut self, name: &str, properties: Properties) -> Result<()>;

    /// Remove a node with no children, along with its outgoing assignments
    /// and every association it takes part in.
    fn delete_node(&mut self, name: &str) -> Result<()>;

    fn exists(&self, name: &str) -> bool;

    fn get_node(&self, name: &str) -> Result<Node>;

    fn get_nodes(&self) -> Result<Vec<Node>>;

    /// Nodes of `kind` whose properties include every entry of `filter`.
    fn find(&self, kind: Kind, filter: &Properties) -> Result<Vec<Node>>;

    fn assign(&mut self, child: &str, parent: &str) -> Result<()>;

    fn deassign(&mut self, child: &str, parent: &str) -> Result<()>;

    fn get_parents(&self, name: &str) -> Result<BTreeSet<String>>;

    fn get_children(&self, name: &str) -> Result<BTreeSet<String>>;

    fn get_assignments(&self) -> Result<Assignments>;

    /// Create or replace the association `subject -> target`.
    fn associate(&mut self, subject: &str, target: &str, operations: Operations) -> Result<()>;

    fn dissociate(&mut self, subject: &str, target: &str) -> Result<()>;

    fn get_associations_for_subject(&self, subject: &str) -> Result<SubjectAssociations>;

    fn get_associations(&self) -> Result<Associations>;
}

/// Structural encoding of a whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: BTreeMap<String, Node>,
    #[serde(default)]
    pub assignments: Assignments,
    #[serde(default)]
    pub associations: Associations,
}

impl GraphSnapshot {
    /// Copy everything readable out of `graph`.
    pub fn capture(graph: &dyn PolicyGraph) -> Result<Self> {
        let nodes = graph
            .get_nodes()?
            .into_iter()
            .map(|n| (n.name.clone(), n))
            .collect();
        Ok(GraphSnapshot {
            nodes,
            assignments: graph.get_assignments()?,
            associations: graph.get_associations()?,
        })
    }
}

#[cfg(test)]
mod tests;

//! In-memory graph store.

use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::{Assignments, Associations, GraphSnapshot, PolicyGraph, SubjectAssociations};
use crate::error::{NgacError, Result};
use crate::types::{check_assignment, check_association, Kind, Node, Operations, Properties};

/// Hash-indexed policy graph with a reverse (parent -> children) index so
/// that delete checks and child lookups do not scan every assignment.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    nodes: AHashMap<String, Node>,
    parents: AHashMap<String, BTreeSet<String>>,
    children: AHashMap<String, BTreeSet<String>>,
    associations: AHashMap<String, BTreeMap<String, Operations>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a snapshot, validating every node and edge.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let mut graph = MemoryGraph::new();

        for (key, node) in snapshot.nodes {
            if key != node.name {
                return Err(NgacError::InvalidStatement(format!(
                    "snapshot key {key:?} does not match node name {:?}",
                    node.name
                )));
            }
            if graph.nodes.contains_key(&key) {
                return Err(NgacError::AlreadyExists(key));
            }
            graph.nodes.insert(key, node);
        }

        for (child, parents) in snapshot.assignments {
            for parent in parents {
                graph.validate_assignment(&child, &parent)?;
                graph.link(&child, &parent);
            }
        }

        if let Some(orphan) = graph
            .nodes
            .values()
            .filter(|n| n.kind != Kind::PolicyClass && !graph.parents.contains_key(&n.name))
            .map(|n| n.name.clone())
            .min()
        {
            return Err(NgacError::NoParents(orphan));
        }

        for (subject, targets) in snapshot.associations {
            for (target, operations) in targets {
                graph.validate_association(&subject, &target)?;
                graph
                    .associations
                    .entry(subject.clone())
                    .or_default()
                    .insert(target, operations);
            }
        }

        debug!(nodes = graph.nodes.len(), "restored graph from snapshot");
        Ok(graph)
    }

    /// Replace this graph's contents with `snapshot`. On error the current
    /// contents are kept.
    pub fn restore(&mut self, snapshot: GraphSnapshot) -> Result<()> {
        *self = MemoryGraph::from_snapshot(snapshot)?;
        Ok(())
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|(name, node)| (name.clone(), node.clone()))
                .collect(),
            assignments: self.assignments(),
            associations: self.associations(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, name: &str) -> Result<&Node> {
        self.nodes
            .get(name)
            .ok_or_else(|| NgacError::node_not_found(name))
    }

    fn validate_assignment(&self, child: &str, parent: &str) -> Result<()> {
        let child_kind = self.node(child)?.kind;
        let parent_kind = self.node(parent)?.kind;
        check_assignment(child_kind, parent_kind)
    }

    fn validate_association(&self, subject: &str, target: &str) -> Result<()> {
        let subject_kind = self.node(subject)?.kind;
        let target_kind = self.node(target)?.kind;
        check_association(subject_kind, target_kind)
    }

    fn link(&mut self, child: &str, parent: &str) {
        self.parents
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string());
        self.children
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
    }

    fn unlink(&mut self, child: &str, parent: &str) {
        if let Some(set) = self.parents.get_mut(child) {
            set.remove(parent);
            if set.is_empty() {
                self.parents.remove(child);
            }
        }
        if let Some(set) = self.children.get_mut(parent) {
            set.remove(child);
            if set.is_empty() {
                self.children.remove(parent);
            }
        }
    }

    fn assignments(&self) -> Assignments {
        self.parents
            .iter()
            .map(|(child, parents)| (child.clone(), parents.clone()))
            .collect()
    }

    fn associations(&self) -> Associations {
        self.associations
            .iter()
            .filter(|(_, targets)| !targets.is_empty())
            .map(|(subject, targets)| (subject.clone(), targets.clone()))
            .collect()
    }
}

impl PolicyGraph for MemoryGraph {
    fn create_policy_class(&mut self, name: &str) -> Result<Node> {
        if self.nodes.contains_key(name) {
            return Err(NgacError::AlreadyExists(name.to_string()));
        }

        let node = Node::new(name, Kind::PolicyClass, Properties::new());
        self.nodes.insert(name.to_string(), node.clone());
        debug!(name, "created policy class");
        Ok(node)
    }

    fn create_node(
        &mut self,
        name: &str,
        kind: Kind,
        properties: Properties,
        parents: &[&str],
    ) -> Result<Node> {
        if self.nodes.contains_key(name) {
            return Err(NgacError::AlreadyExists(name.to_string()));
        }
        if parents.is_empty() {
            return Err(NgacError::NoParents(name.to_string()));
        }
        // Validate every parent before touching the store.
        for parent in parents {
            check_assignment(kind, self.node(parent)?.kind)?;
        }

        let node = Node::new(name, kind, properties);
        self.nodes.insert(name.to_string(), node.clone());
        for parent in parents {
            self.link(name, parent);
        }
        debug!(name, %kind, ?parents, "created node");
        Ok(node)
    }

    fn update_node(&mut self, name: &str, properties: Properties) -> Result<()> {
        let node = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| NgacError::node_not_found(name))?;
        node.properties = properties;
        Ok(())
    }

    fn delete_node(&mut self, name: &str) -> Result<()> {
        self.node(name)?;
        if self.children.get(name).is_some_and(|c| !c.is_empty()) {
            return Err(NgacError::HasChildren(name.to_string()));
        }

        if let Some(parents) = self.parents.remove(name) {
            for parent in parents {
                self.unlink(name, &parent);
            }
        }
        self.associations.remove(name);
        for targets in self.associations.values_mut() {
            targets.remove(name);
        }
        self.nodes.remove(name);
        debug!(name, "deleted node");
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    fn get_node(&self, name: &str) -> Result<Node> {
        self.node(name).cloned()
    }

    fn get_nodes(&self) -> Result<Vec<Node>> {
        let mut nodes: Vec<Node> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nodes)
    }

    fn find(&self, kind: Kind, filter: &Properties) -> Result<Vec<Node>> {
        let mut found: Vec<Node> = self
            .nodes
            .values()
            .filter(|n| n.kind == kind && n.matches(filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    fn assign(&mut self, child: &str, parent: &str) -> Result<()> {
        self.validate_assignment(child, parent)?;
        self.link(child, parent);
        debug!(child, parent, "assigned");
        Ok(())
    }

    fn deassign(&mut self, child: &str, parent: &str) -> Result<()> {
        self.node(child)?;
        self.unlink(child, parent);
        debug!(child, parent, "deassigned");
        Ok(())
    }

    fn get_parents(&self, name: &str) -> Result<BTreeSet<String>> {
        self.node(name)?;
        Ok(self.parents.get(name).cloned().unwrap_or_default())
    }

    fn get_children(&self, name: &str) -> Result<BTreeSet<String>> {
        self.node(name)?;
        Ok(self.children.get(name).cloned().unwrap_or_default())
    }

    fn get_assignments(&self) -> Result<Assignments> {
        Ok(self.assignments())
    }

    fn associate(&mut self, subject: &str, target: &str, operations: Operations) -> Result<()> {
        self.validate_association(subject, target)?;
        debug!(subject, target, %operations, "associated");
        self.associations
            .entry(subject.to_string())
            .or_default()
            .insert(target.to_string(), operations);
        Ok(())
    }

    fn dissociate(&mut self, subject: &str, target: &str) -> Result<()> {
        if let Some(targets) = self.associations.get_mut(subject) {
            targets.remove(target);
            if targets.is_empty() {
                self.associations.remove(subject);
            }
        }
        Ok(())
    }

    fn get_associations_for_subject(&self, subject: &str) -> Result<SubjectAssociations> {
        self.node(subject)?;
        Ok(self.associations.get(subject).cloned().unwrap_or_default())
    }

    fn get_associations(&self) -> Result<Associations> {
        Ok(self.associations())
    }
}

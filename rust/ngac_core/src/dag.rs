//! Upward graph walkers.
//!
//! Both walkers start at a node and move toward its parents (containing
//! attributes and policy classes). They take two callbacks:
//! - `visit(node)`: called once per reached node
//! - `propagate(parent, child)`: called once per traversed edge, to carry
//!   accumulated state from an ancestor down to a descendant
//!
//! Any callback or store error aborts the walk and is returned unchanged.

use ahash::AHashSet;
use std::collections::VecDeque;
use tracing::trace;

use crate::error::Result;
use crate::graph::PolicyGraph;
use crate::types::Node;

/// A traversal strategy over the containment relation.
pub trait Searcher {
    fn traverse<P, V>(&self, start: &Node, propagate: P, visit: V) -> Result<()>
    where
        P: FnMut(&Node, &Node) -> Result<()>,
        V: FnMut(&Node) -> Result<()>;
}

/// Breadth-first walker: shallowest ancestors are visited first.
pub struct Bfs<'g> {
    graph: &'g dyn PolicyGraph,
}

impl<'g> Bfs<'g> {
    pub fn new(graph: &'g dyn PolicyGraph) -> Self {
        Bfs { graph }
    }
}

impl Searcher for Bfs<'_> {
    fn traverse<P, V>(&self, start: &Node, mut propagate: P, mut visit: V) -> Result<()>
    where
        P: FnMut(&Node, &Node) -> Result<()>,
        V: FnMut(&Node) -> Result<()>,
    {
        let mut seen: AHashSet<String> = AHashSet::new();
        let mut queue: VecDeque<Node> = VecDeque::new();
        seen.insert(start.name.clone());
        queue.push_back(start.clone());

        while let Some(node) = queue.pop_front() {
            trace!(node = %node.name, "bfs visit");
            visit(&node)?;

            for parent_name in self.graph.get_parents(&node.name)? {
                if !seen.insert(parent_name.clone()) {
                    continue;
                }
                let parent = self.graph.get_node(&parent_name)?;
                propagate(&parent, &node)?;
                queue.push_back(parent);
            }
        }

        Ok(())
    }
}

/// Depth-first walker: every parent is fully processed before the edge to
/// it is propagated, and a node is visited only after all of its parents.
pub struct Dfs<'g> {
    graph: &'g dyn PolicyGraph,
}

impl<'g> Dfs<'g> {
    pub fn new(graph: &'g dyn PolicyGraph) -> Self {
        Dfs { graph }
    }

    fn walk<P, V>(
        &self,
        node: &Node,
        visited: &mut AHashSet<String>,
        propagate: &mut P,
        visit: &mut V,
    ) -> Result<()>
    where
        P: FnMut(&Node, &Node) -> Result<()>,
        V: FnMut(&Node) -> Result<()>,
    {
        if !visited.insert(node.name.clone()) {
            return Ok(());
        }

        for parent_name in self.graph.get_parents(&node.name)? {
            let parent = self.graph.get_node(&parent_name)?;
            self.walk(&parent, visited, propagate, visit)?;
            // Diamonds: a parent reached earlier through another path still
            // contributes along this edge.
            propagate(&parent, node)?;
        }

        trace!(node = %node.name, "dfs visit");
        visit(node)
    }
}

impl Searcher for Dfs<'_> {
    fn traverse<P, V>(&self, start: &Node, mut propagate: P, mut visit: V) -> Result<()>
    where
        P: FnMut(&Node, &Node) -> Result<()>,
        V: FnMut(&Node) -> Result<()>,
    {
        let mut visited = AHashSet::new();
        self.walk(start, &mut visited, &mut propagate, &mut visit)
    }
}

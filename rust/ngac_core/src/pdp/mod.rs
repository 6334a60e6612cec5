//! Policy decision point.
//!
//! A decision re-walks the graph every time, in three steps:
//! 1. subject side (breadth-first from the subject): union of every
//!    association reachable through an ancestor ("border targets") and every
//!    prohibition attached to an ancestor
//! 2. target side (depth-first from the target): one operation set per policy
//!    class the target is contained in, with border-target grants injected
//!    where they attach
//! 3. resolution: intersect the policy-class sets, then subtract whatever
//!    the prohibitions deny for this target

use ahash::{AHashMap, AHashSet};
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::debug;

use crate::dag::{Bfs, Dfs, Searcher};
use crate::error::Result;
use crate::graph::PolicyGraph;
use crate::prohibitions::ProhibitionStore;
use crate::types::{ContainerCondition, Kind, Node, Operations, Prohibition};

/// What the subject side of the graph contributes to a decision.
#[derive(Debug, Default)]
struct UserContext {
    border_targets: AHashMap<String, Operations>,
    prohibitions: Vec<Prohibition>,
}

/// What the target side of the graph contributes to a decision.
#[derive(Debug, Default)]
struct TargetContext {
    /// Policy class name -> operations reaching the target through it.
    pc_set: BTreeMap<String, Operations>,
    /// Every node reached walking up from the target, target included.
    ancestors: AHashSet<String>,
}

/// Per-node lane state while walking up from the target.
#[derive(Default)]
struct TargetWalk {
    lanes: AHashMap<String, BTreeMap<String, Operations>>,
    ancestors: AHashSet<String>,
}

/// Outcome of one subject/target evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    /// Operations granted under every policy class of the target.
    pub allowed: Operations,
    /// Operations removed by prohibitions that fired.
    pub denied: Operations,
}

impl Decision {
    /// `allowed` minus `denied`.
    pub fn effective(&self) -> Operations {
        let mut ops = self.allowed.clone();
        ops.remove_all(&self.denied);
        ops
    }

    /// True if the effective set covers `op`.
    pub fn permits(&self, op: &str) -> bool {
        self.effective().contains(op)
    }
}

/// Answers permission queries against a graph and a prohibition store.
pub struct Decider<'a> {
    graph: &'a dyn PolicyGraph,
    prohibitions: &'a dyn ProhibitionStore,
}

impl<'a> Decider<'a> {
    pub fn new(graph: &'a dyn PolicyGraph, prohibitions: &'a dyn ProhibitionStore) -> Self {
        Decider {
            graph,
            prohibitions,
        }
    }

    /// True if every operation in `operations` is contained in
    /// [`Decider::list_permissions`] for the same pair.
    ///
    /// An empty request returns `false` rather than the vacuous `true` a
    /// plain "all requested ops are listed" check would give.
    pub fn has_permissions(
        &self,
        subject: &str,
        target: &str,
        operations: &[&str],
    ) -> Result<bool> {
        if operations.is_empty() {
            return Ok(false);
        }
        let effective = self.list_permissions(subject, target)?;
        Ok(operations.iter().all(|op| effective.contains(op)))
    }

    /// Effective operations `subject` holds on `target`.
    pub fn list_permissions(&self, subject: &str, target: &str) -> Result<Operations> {
        Ok(self.decide(subject, target)?.effective())
    }

    /// Full allowed/denied breakdown for `subject` on `target`. Unknown
    /// subjects or targets yield an empty decision.
    pub fn decide(&self, subject: &str, target: &str) -> Result<Decision> {
        if !self.graph.exists(subject) || !self.graph.exists(target) {
            debug!(subject, target, "unknown subject or target, nothing granted");
            return Ok(Decision::default());
        }

        let subject_node = self.graph.get_node(subject)?;
        let target_node = self.graph.get_node(target)?;

        let user_ctx = self.user_dag(&subject_node)?;
        let target_ctx = self.target_dag(&target_node, &user_ctx)?;

        let decision = Decision {
            allowed: allowed_permissions(&target_ctx),
            denied: denied_permissions(&user_ctx, &target_ctx, target),
        };
        debug!(
            subject,
            target,
            allowed = %decision.allowed,
            denied = %decision.denied,
            "decision"
        );
        Ok(decision)
    }

    fn user_dag(&self, subject: &Node) -> Result<UserContext> {
        let mut ctx = UserContext::default();

        Bfs::new(self.graph).traverse(
            subject,
            |_, _| Ok(()),
            |node| {
                for (target, ops) in self.graph.get_associations_for_subject(&node.name)? {
                    ctx.border_targets.entry(target).or_default().add_all(&ops);
                }
                ctx.prohibitions.extend(self.prohibitions.get(&node.name)?);
                Ok(())
            },
        )?;

        Ok(ctx)
    }

    fn target_dag(&self, target: &Node, user_ctx: &UserContext) -> Result<TargetContext> {
        let walk = RefCell::new(TargetWalk::default());

        Dfs::new(self.graph).traverse(
            target,
            |parent, child| {
                let mut walk = walk.borrow_mut();
                let inherited = walk.lanes.get(&parent.name).cloned().unwrap_or_default();
                let lanes = walk.lanes.entry(child.name.clone()).or_default();
                for (pc, ops) in inherited {
                    lanes.entry(pc).or_default().add_all(&ops);
                }
                Ok(())
            },
            |node| {
                let mut walk = walk.borrow_mut();
                walk.ancestors.insert(node.name.clone());
                let lanes = walk.lanes.entry(node.name.clone()).or_default();

                if node.kind == Kind::PolicyClass {
                    lanes.insert(node.name.clone(), Operations::new());
                } else if let Some(granted) = user_ctx.border_targets.get(&node.name) {
                    for ops in lanes.values_mut() {
                        ops.add_all(granted);
                    }
                }
                Ok(())
            },
        )?;

        let mut walk = walk.into_inner();
        Ok(TargetContext {
            pc_set: walk.lanes.remove(&target.name).unwrap_or_default(),
            ancestors: walk.ancestors,
        })
    }
}

/// Fold the policy-class lanes into the set allowed under all of them.
fn allowed_permissions(ctx: &TargetContext) -> Operations {
    let mut lanes = ctx.pc_set.values();
    let Some(first) = lanes.next() else {
        return Operations::new();
    };

    let mut allowed = first.clone();
    for ops in lanes {
        allowed.intersect_lane(ops);
    }
    allowed
}

fn denied_permissions(
    user_ctx: &UserContext,
    target_ctx: &TargetContext,
    target: &str,
) -> Operations {
    let mut denied = Operations::new();
    for prohibition in &user_ctx.prohibitions {
        if prohibition_applies(prohibition, target, &target_ctx.ancestors) {
            debug!(prohibition = %prohibition.name, target, "prohibition applies");
            denied.add_all(&prohibition.operations);
        }
    }
    denied
}

/// Evaluate a prohibition's containers against the target's ancestors.
///
/// A container naming the target itself is skipped. With `intersection`
/// every remaining container must match, and an empty remainder never
/// fires; otherwise one match is enough.
pub(crate) fn prohibition_applies(
    prohibition: &Prohibition,
    target: &str,
    ancestors: &AHashSet<String>,
) -> bool {
    let is_match = |c: &ContainerCondition| ancestors.contains(&c.name) != c.complement;
    let mut conditions = prohibition
        .containers
        .iter()
        .filter(|c| c.name != target)
        .peekable();

    if prohibition.intersection {
        conditions.peek().is_some() && conditions.all(is_match)
    } else {
        conditions.any(is_match)
    }
}

//! Policy store: graph and prohibitions kept together.
//!
//! [`PolicyStore`] is the single-threaded bundle. [`SharedPolicyStore`] wraps
//! it in a reader-writer lock: statements take the write lock, decisions take
//! the read lock, so a decision never observes a half-applied statement.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{NgacError, Result};
use crate::graph::{GraphSnapshot, MemoryGraph};
use crate::pdp::{Decider, Decision};
use crate::prohibitions::{MemoryProhibitions, ProhibitionStore};
use crate::statement::Statement;
use crate::types::{Operations, Prohibition};

/// A statement in a batch failed. Statements before `index` stay applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("statement {index} ({statement}) failed: {source}")]
pub struct ApplyError {
    pub index: usize,
    pub statement: &'static str,
    pub source: NgacError,
}

/// Serialized form of a whole policy store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub graph: GraphSnapshot,
    #[serde(default)]
    pub prohibitions: Vec<Prohibition>,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    graph: MemoryGraph,
    prohibitions: MemoryProhibitions,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: PolicySnapshot) -> Result<Self> {
        Ok(PolicyStore {
            graph: MemoryGraph::from_snapshot(snapshot.graph)?,
            prohibitions: MemoryProhibitions::from_list(snapshot.prohibitions)?,
        })
    }

    pub fn graph(&self) -> &MemoryGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut MemoryGraph {
        &mut self.graph
    }

    pub fn prohibitions(&self) -> &MemoryProhibitions {
        &self.prohibitions
    }

    pub fn prohibitions_mut(&mut self) -> &mut MemoryProhibitions {
        &mut self.prohibitions
    }

    pub fn apply(&mut self, statement: &Statement) -> Result<()> {
        statement.apply(&mut self.graph, &mut self.prohibitions)
    }

    /// Apply `statements` in order, stopping at the first failure.
    pub fn apply_all(&mut self, statements: &[Statement]) -> std::result::Result<(), ApplyError> {
        for (index, statement) in statements.iter().enumerate() {
            if let Err(source) = self.apply(statement) {
                warn!(index, statement = statement.kind(), error = %source, "statement failed");
                return Err(ApplyError {
                    index,
                    statement: statement.kind(),
                    source,
                });
            }
        }
        debug!(count = statements.len(), "applied statements");
        Ok(())
    }

    pub fn decider(&self) -> Decider<'_> {
        Decider::new(&self.graph, &self.prohibitions)
    }

    pub fn snapshot(&self) -> Result<PolicySnapshot> {
        Ok(PolicySnapshot {
            graph: self.graph.snapshot(),
            prohibitions: self.prohibitions.all()?,
        })
    }

    /// Replace the whole store. On error the current contents are kept.
    pub fn restore(&mut self, snapshot: PolicySnapshot) -> Result<()> {
        *self = PolicyStore::from_snapshot(snapshot)?;
        Ok(())
    }
}

/// Cloneable handle to a store shared between threads.
#[derive(Debug, Clone, Default)]
pub struct SharedPolicyStore {
    inner: Arc<RwLock<PolicyStore>>,
}

impl SharedPolicyStore {
    pub fn new(store: PolicyStore) -> Self {
        SharedPolicyStore {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, PolicyStore> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, PolicyStore> {
        self.inner.write()
    }

    pub fn apply(&self, statement: &Statement) -> Result<()> {
        self.inner.write().apply(statement)
    }

    pub fn apply_all(&self, statements: &[Statement]) -> std::result::Result<(), ApplyError> {
        self.inner.write().apply_all(statements)
    }

    pub fn has_permissions(
        &self,
        subject: &str,
        target: &str,
        operations: &[&str],
    ) -> Result<bool> {
        self.inner
            .read()
            .decider()
            .has_permissions(subject, target, operations)
    }

    pub fn list_permissions(&self, subject: &str, target: &str) -> Result<Operations> {
        self.inner.read().decider().list_permissions(subject, target)
    }

    pub fn decide(&self, subject: &str, target: &str) -> Result<Decision> {
        self.inner.read().decider().decide(subject, target)
    }

    pub fn snapshot(&self) -> Result<PolicySnapshot> {
        self.inner.read().snapshot()
    }
}

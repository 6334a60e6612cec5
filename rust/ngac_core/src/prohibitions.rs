//! Prohibition store: named denial rules keyed by subject.

use ahash::AHashMap;
use tracing::debug;

use crate::error::{NgacError, Result};
use crate::types::Prohibition;

/// Storage contract for prohibitions.
pub trait ProhibitionStore {
    /// Attach a prohibition to its subject. Names are unique per subject.
    fn add(&mut self, prohibition: Prohibition) -> Result<()>;

    /// Prohibitions attached to `subject`, in insertion order.
    fn get(&self, subject: &str) -> Result<Vec<Prohibition>>;

    /// Remove the prohibition `name` from `subject`.
    fn delete(&mut self, subject: &str, name: &str) -> Result<()>;

    /// Every prohibition, grouped by subject name order.
    fn all(&self) -> Result<Vec<Prohibition>>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryProhibitions {
    by_subject: AHashMap<String, Vec<Prohibition>>,
}

impl MemoryProhibitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a flat list, rejecting duplicate names.
    pub fn from_list(prohibitions: Vec<Prohibition>) -> Result<Self> {
        let mut store = MemoryProhibitions::new();
        for p in prohibitions {
            store.add(p)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.by_subject.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProhibitionStore for MemoryProhibitions {
    fn add(&mut self, prohibition: Prohibition) -> Result<()> {
        let list = self
            .by_subject
            .entry(prohibition.subject.clone())
            .or_default();
        if list.iter().any(|p| p.name == prohibition.name) {
            return Err(NgacError::AlreadyExists(prohibition.name));
        }
        debug!(
            name = %prohibition.name,
            subject = %prohibition.subject,
            operations = %prohibition.operations,
            intersection = prohibition.intersection,
            "added prohibition"
        );
        list.push(prohibition);
        Ok(())
    }

    fn get(&self, subject: &str) -> Result<Vec<Prohibition>> {
        Ok(self.by_subject.get(subject).cloned().unwrap_or_default())
    }

    fn delete(&mut self, subject: &str, name: &str) -> Result<()> {
        let list = self
            .by_subject
            .get_mut(subject)
            .ok_or_else(|| NgacError::prohibition_not_found(name))?;
        let before = list.len();
        list.retain(|p| p.name != name);
        if list.len() == before {
            return Err(NgacError::prohibition_not_found(name));
        }
        if list.is_empty() {
            self.by_subject.remove(subject);
        }
        debug!(subject, name, "deleted prohibition");
        Ok(())
    }

    fn all(&self) -> Result<Vec<Prohibition>> {
        let mut subjects: Vec<&String> = self.by_subject.keys().collect();
        subjects.sort();
        Ok(subjects
            .into_iter()
            .flat_map(|s| self.by_subject[s].iter().cloned())
            .collect())
    }
}

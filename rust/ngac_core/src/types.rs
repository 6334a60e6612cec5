//! Domain types shared across ngac_core modules.
//!
//! Node kinds, operation sets, prohibitions, and the two kind-compatibility
//! tables that decide which containment and association edges are legal.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{EdgeRelation, NgacError, Result};

/// Operation name that stands for every operation.
pub const ALL_OPS: &str = "*";

/// Prefix marking a complemented container in DENY statements.
pub const COMPLEMENT_PREFIX: char = '!';

/// Node properties (unordered, keys unique).
pub type Properties = BTreeMap<String, String>;

/// Kind of a policy graph node.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Kind {
    #[serde(rename = "PC")]
    PolicyClass,
    #[serde(rename = "OA")]
    ObjectAttribute,
    #[serde(rename = "UA")]
    UserAttribute,
    #[serde(rename = "O")]
    Object,
    #[serde(rename = "U")]
    User,
}

impl Kind {
    pub const ALL: [Kind; 5] = [
        Kind::PolicyClass,
        Kind::ObjectAttribute,
        Kind::UserAttribute,
        Kind::Object,
        Kind::User,
    ];

    /// Short code used in messages and serialized form.
    pub fn code(self) -> &'static str {
        match self {
            Kind::PolicyClass => "PC",
            Kind::ObjectAttribute => "OA",
            Kind::UserAttribute => "UA",
            Kind::Object => "O",
            Kind::User => "U",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Containment table: may a `child` node be assigned to a `parent` node?
pub fn check_assignment(child: Kind, parent: Kind) -> Result<()> {
    let allowed = matches!(
        (child, parent),
        (Kind::ObjectAttribute, Kind::ObjectAttribute)
            | (Kind::ObjectAttribute, Kind::PolicyClass)
            | (Kind::UserAttribute, Kind::UserAttribute)
            | (Kind::UserAttribute, Kind::PolicyClass)
            | (Kind::Object, Kind::ObjectAttribute)
            | (Kind::User, Kind::UserAttribute)
    );
    if allowed {
        Ok(())
    } else {
        Err(NgacError::InvalidEdge {
            relation: EdgeRelation::Assignment,
            from: child,
            to: parent,
        })
    }
}

/// Association table: only user attributes grant, and only on attributes.
pub fn check_association(subject: Kind, target: Kind) -> Result<()> {
    let allowed = subject == Kind::UserAttribute
        && matches!(target, Kind::ObjectAttribute | Kind::UserAttribute);
    if allowed {
        Ok(())
    } else {
        Err(NgacError::InvalidEdge {
            relation: EdgeRelation::Association,
            from: subject,
            to: target,
        })
    }
}

/// A set of operation names. `"*"` grants every operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operations(BTreeSet<String>);

impl Operations {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wildcard set `{"*"}`.
    pub fn all() -> Self {
        Self::from([ALL_OPS])
    }

    /// True if `op` is present or the set holds the wildcard.
    pub fn contains(&self, op: &str) -> bool {
        self.0.contains(op) || self.has_wildcard()
    }

    pub fn has_wildcard(&self) -> bool {
        self.0.contains(ALL_OPS)
    }

    pub fn add(&mut self, op: impl Into<String>) {
        self.0.insert(op.into());
    }

    pub fn add_all(&mut self, other: &Operations) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn remove(&mut self, op: &str) {
        self.0.remove(op);
    }

    /// Remove every operation in `other`; a wildcard in `other` clears all.
    pub fn remove_all(&mut self, other: &Operations) {
        if other.has_wildcard() {
            self.0.clear();
            return;
        }
        for op in &other.0 {
            self.0.remove(op);
        }
    }

    /// Narrow this set by one more policy-class lane.
    ///
    /// A wildcard on either side never removes anything: if `self` is the
    /// wildcard, `other` becomes the new basis; if `other` is, `self` is kept.
    pub fn intersect_lane(&mut self, other: &Operations) {
        if self.has_wildcard() {
            *self = other.clone();
        } else if !other.has_wildcard() {
            self.0.retain(|op| other.0.contains(op));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Operations {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Operations(iter.into_iter().map(Into::into).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Operations {
    fn from(ops: [&str; N]) -> Self {
        ops.into_iter().collect()
    }
}

impl fmt::Display for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, op) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{op}")?;
        }
        write!(f, "]")
    }
}

/// A node in the policy graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub kind: Kind,
    #[serde(default)]
    pub properties: Properties,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: Kind, properties: Properties) -> Self {
        Node {
            name: name.into(),
            kind,
            properties,
        }
    }

    /// True if every `(key, value)` in `filter` is present on this node.
    pub fn matches(&self, filter: &Properties) -> bool {
        filter
            .iter()
            .all(|(k, v)| self.properties.get(k).is_some_and(|p| p == v))
    }
}

/// One container reference inside a prohibition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerCondition {
    pub name: String,
    /// Set when the container was given with the `!` marker.
    #[serde(default)]
    pub complement: bool,
}

impl ContainerCondition {
    pub fn new(name: impl Into<String>, complement: bool) -> Self {
        ContainerCondition {
            name: name.into(),
            complement,
        }
    }

    /// Parse `"oa1"` or `"!oa1"`.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(COMPLEMENT_PREFIX) {
            Some(name) => ContainerCondition::new(name, true),
            None => ContainerCondition::new(raw, false),
        }
    }
}

impl fmt::Display for ContainerCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.complement {
            write!(f, "{COMPLEMENT_PREFIX}")?;
        }
        f.write_str(&self.name)
    }
}

/// A named denial rule attached to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prohibition {
    pub name: String,
    pub subject: String,
    pub operations: Operations,
    #[serde(default)]
    pub containers: Vec<ContainerCondition>,
    /// All containers must match (AND) instead of any (OR).
    #[serde(default)]
    pub intersection: bool,
}

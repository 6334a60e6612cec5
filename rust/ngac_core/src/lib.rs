//! `ngac_core`: Next Generation Access Control policy engine.
//!
//! Stores a policy graph (users, objects, attributes, policy classes, and
//! the assignment/association edges between them) plus subject-scoped
//! prohibitions, and answers "may this subject perform these operations on
//! this target?" by walking the graph on every query.
//!
//! Modules:
//! - `types`: node kinds, operation sets, prohibitions, kind tables
//! - `error`: `NgacError` and the crate `Result`
//! - `graph`: `PolicyGraph` trait and the in-memory store
//! - `prohibitions`: `ProhibitionStore` trait and the in-memory store
//! - `dag`: breadth/depth-first upward walkers
//! - `pdp`: the decider
//! - `statement`: policy statements applied to the stores
//! - `store`: graph + prohibitions bundle, shared locked handle
//! - `config`: policy document and snapshot JSON helpers

pub mod config;
pub mod dag;
pub mod error;
pub mod graph;
pub mod pdp;
pub mod prohibitions;
pub mod statement;
pub mod store;
pub mod types;

pub use error::{NgacError, Result};
pub use graph::{GraphSnapshot, MemoryGraph, PolicyGraph};
pub use pdp::{Decider, Decision};
pub use prohibitions::{MemoryProhibitions, ProhibitionStore};
pub use statement::Statement;
pub use store::{ApplyError, PolicySnapshot, PolicyStore, SharedPolicyStore};
pub use types::{ContainerCondition, Kind, Node, Operations, Prohibition, Properties};

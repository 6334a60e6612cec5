//! Policy document and snapshot (de)serialization helpers.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::statement::Statement;
use crate::store::PolicySnapshot;

/// A policy document: `{"statements": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// Parse a policy document into its statements.
pub fn parse_policy_document(json: &str) -> Result<Vec<Statement>> {
    let doc: PolicyDocument = serde_json::from_str(json)?;
    Ok(doc.statements)
}

/// Encode statements as a policy document.
pub fn to_policy_document(statements: &[Statement]) -> Result<String> {
    let doc = PolicyDocument {
        statements: statements.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Parse a store snapshot.
pub fn parse_snapshot(json: &str) -> Result<PolicySnapshot> {
    Ok(serde_json::from_str(json)?)
}

pub fn snapshot_to_json(snapshot: &PolicySnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

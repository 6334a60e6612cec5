//! Policy statements: the unit a policy document is made of.
//!
//! Each statement maps onto exactly one graph or prohibition store call.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NgacError, Result};
use crate::graph::PolicyGraph;
use crate::prohibitions::ProhibitionStore;
use crate::types::{ContainerCondition, Kind, Operations, Prohibition, Properties};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    CreatePolicyClass {
        name: String,
    },
    CreateNode {
        name: String,
        kind: Kind,
        #[serde(default)]
        properties: Properties,
        #[serde(default)]
        parents: Vec<String>,
    },
    Assign {
        child: String,
        parent: String,
    },
    Deassign {
        child: String,
        parent: String,
    },
    DeleteNode {
        name: String,
    },
    Grant {
        subject: String,
        target: String,
        operations: Operations,
    },
    /// Containers prefixed with `!` match targets outside them.
    Deny {
        subject: String,
        operations: Operations,
        #[serde(default)]
        intersection: bool,
        #[serde(default)]
        containers: Vec<String>,
    },
}

impl Statement {
    /// Short tag used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::CreatePolicyClass { .. } => "create_policy_class",
            Statement::CreateNode { .. } => "create_node",
            Statement::Assign { .. } => "assign",
            Statement::Deassign { .. } => "deassign",
            Statement::DeleteNode { .. } => "delete_node",
            Statement::Grant { .. } => "grant",
            Statement::Deny { .. } => "deny",
        }
    }

    /// Apply this statement to the stores.
    pub fn apply(
        &self,
        graph: &mut dyn PolicyGraph,
        prohibitions: &mut dyn ProhibitionStore,
    ) -> Result<()> {
        debug!(statement = self.kind(), "applying statement");
        match self {
            Statement::CreatePolicyClass { name } => {
                graph.create_policy_class(name)?;
            }
            Statement::CreateNode {
                name,
                kind: Kind::PolicyClass,
                parents,
                ..
            } => {
                if !parents.is_empty() {
                    return Err(NgacError::InvalidStatement(format!(
                        "policy class {name:?} cannot have parents"
                    )));
                }
                graph.create_policy_class(name)?;
            }
            Statement::CreateNode {
                name,
                kind,
                properties,
                parents,
            } => {
                let parents: Vec<&str> = parents.iter().map(String::as_str).collect();
                graph.create_node(name, *kind, properties.clone(), &parents)?;
            }
            Statement::Assign { child, parent } => graph.assign(child, parent)?,
            Statement::Deassign { child, parent } => graph.deassign(child, parent)?,
            Statement::DeleteNode { name } => graph.delete_node(name)?,
            Statement::Grant {
                subject,
                target,
                operations,
            } => graph.associate(subject, target, operations.clone())?,
            Statement::Deny { .. } => prohibitions.add(self.to_prohibition()?)?,
        }
        Ok(())
    }

    /// Build the prohibition a `Deny` statement stands for.
    pub fn to_prohibition(&self) -> Result<Prohibition> {
        let Statement::Deny {
            subject,
            operations,
            intersection,
            containers,
        } = self
        else {
            return Err(NgacError::InvalidStatement(format!(
                "{} does not describe a prohibition",
                self.kind()
            )));
        };

        if subject.is_empty() {
            return Err(NgacError::InvalidStatement("deny without a subject".into()));
        }
        if operations.is_empty() {
            return Err(NgacError::InvalidStatement(format!(
                "deny for {subject:?} names no operations"
            )));
        }

        let conditions: Vec<ContainerCondition> = containers
            .iter()
            .map(|c| ContainerCondition::parse(c))
            .collect();
        if conditions.iter().any(|c| c.name.is_empty()) {
            return Err(NgacError::InvalidStatement(format!(
                "deny for {subject:?} has an empty container name"
            )));
        }

        Ok(Prohibition {
            name: format!(
                "deny-{subject}-{operations}-on-[{}]",
                containers.join(" ")
            ),
            subject: subject.clone(),
            operations: operations.clone(),
            containers: conditions,
            intersection: *intersection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use crate::prohibitions::MemoryProhibitions;

    fn apply_all(statements: &[Statement]) -> (MemoryGraph, MemoryProhibitions) {
        let mut graph = MemoryGraph::new();
        let mut prohibitions = MemoryProhibitions::new();
        for s in statements {
            s.apply(&mut graph, &mut prohibitions).unwrap();
        }
        (graph, prohibitions)
    }

    fn create(name: &str, kind: Kind, parents: &[&str]) -> Statement {
        Statement::CreateNode {
            name: name.into(),
            kind,
            properties: Properties::new(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn builds_graph() {
        let (graph, _) = apply_all(&[
            Statement::CreatePolicyClass { name: "pc1".into() },
            create("oa1", Kind::ObjectAttribute, &["pc1"]),
            create("oa2", Kind::ObjectAttribute, &["pc1"]),
            create("ua1", Kind::UserAttribute, &["pc1"]),
            create("o1", Kind::Object, &["oa1"]),
            Statement::Assign {
                child: "o1".into(),
                parent: "oa2".into(),
            },
            Statement::Deassign {
                child: "o1".into(),
                parent: "oa1".into(),
            },
            Statement::Grant {
                subject: "ua1".into(),
                target: "oa2".into(),
                operations: Operations::from(["r"]),
            },
        ]);

        let parents: Vec<String> = graph.get_parents("o1").unwrap().into_iter().collect();
        assert_eq!(parents, vec!["oa2"]);
        assert_eq!(
            graph.get_associations_for_subject("ua1").unwrap()["oa2"],
            Operations::from(["r"])
        );
    }

    #[test]
    fn create_node_with_policy_class_kind() {
        let (graph, _) = apply_all(&[create("pc1", Kind::PolicyClass, &[])]);
        assert_eq!(graph.get_node("pc1").unwrap().kind, Kind::PolicyClass);

        let mut graph = MemoryGraph::new();
        let mut prohibitions = MemoryProhibitions::new();
        graph.create_policy_class("pc0").unwrap();
        let err = create("pc1", Kind::PolicyClass, &["pc0"])
            .apply(&mut graph, &mut prohibitions)
            .unwrap_err();
        assert!(matches!(err, NgacError::InvalidStatement(_)));
        assert!(!graph.exists("pc1"));
    }

    #[test]
    fn store_errors_pass_through() {
        let mut graph = MemoryGraph::new();
        let mut prohibitions = MemoryProhibitions::new();
        let err = create("o1", Kind::Object, &["missing"])
            .apply(&mut graph, &mut prohibitions)
            .unwrap_err();
        assert_eq!(err, NgacError::node_not_found("missing"));
    }

    #[test]
    fn deny_parses_complement_and_names_prohibition() {
        let (_, prohibitions) = apply_all(&[Statement::Deny {
            subject: "u1".into(),
            operations: Operations::from(["w", "r"]),
            intersection: true,
            containers: vec!["oa1".into(), "!oa2".into()],
        }]);

        let stored = prohibitions.get("u1").unwrap();
        assert_eq!(stored.len(), 1);
        let p = &stored[0];
        assert_eq!(p.name, "deny-u1-[r w]-on-[oa1 !oa2]");
        assert!(p.intersection);
        assert_eq!(
            p.containers,
            vec![
                ContainerCondition::new("oa1", false),
                ContainerCondition::new("oa2", true)
            ]
        );
    }

    #[test]
    fn repeated_deny_is_rejected() {
        let deny = Statement::Deny {
            subject: "u1".into(),
            operations: Operations::from(["w"]),
            intersection: false,
            containers: vec!["oa1".into()],
        };
        let mut graph = MemoryGraph::new();
        let mut prohibitions = MemoryProhibitions::new();
        deny.apply(&mut graph, &mut prohibitions).unwrap();
        assert!(matches!(
            deny.apply(&mut graph, &mut prohibitions),
            Err(NgacError::AlreadyExists(_))
        ));
    }

    #[test]
    fn malformed_deny_is_rejected() {
        let cases = [
            Statement::Deny {
                subject: String::new(),
                operations: Operations::from(["w"]),
                intersection: false,
                containers: vec![],
            },
            Statement::Deny {
                subject: "u1".into(),
                operations: Operations::new(),
                intersection: false,
                containers: vec![],
            },
            Statement::Deny {
                subject: "u1".into(),
                operations: Operations::from(["w"]),
                intersection: false,
                containers: vec!["!".into()],
            },
        ];
        for statement in cases {
            assert!(matches!(
                statement.to_prohibition(),
                Err(NgacError::InvalidStatement(_))
            ));
        }
        assert!(Statement::DeleteNode { name: "x".into() }
            .to_prohibition()
            .is_err());
    }

    #[test]
    fn json_shape() {
        let json = r#"{"type":"create_node","name":"o1","kind":"O","parents":["oa1"]}"#;
        let statement: Statement = serde_json::from_str(json).unwrap();
        assert_eq!(statement, create("o1", Kind::Object, &["oa1"]));

        let deny = Statement::Deny {
            subject: "u1".into(),
            operations: Operations::all(),
            intersection: false,
            containers: vec!["!oa1".into()],
        };
        let encoded = serde_json::to_string(&deny).unwrap();
        assert!(encoded.contains(r#""type":"deny""#));
        assert!(encoded.contains(r#""operations":["*"]"#));
        assert_eq!(serde_json::from_str::<Statement>(&encoded).unwrap(), deny);
    }
}

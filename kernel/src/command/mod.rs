// Class Commands
//
// Mutations handed to a class by the consensus layer, already ordered.

use serde::{Deserialize, Serialize};

use crate::schema::{ClassMetadata, Property};
use crate::sharding::ShardingState;

/// A tenant entry inside an add or update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,

    #[serde(default)]
    pub status: String,

    /// Owner nodes. `None` on update keeps the current owners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<String>>,
}

impl Tenant {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            nodes: None,
        }
    }

    pub fn on_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes = Some(nodes.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTenantsRequest {
    pub tenants: Vec<Tenant>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTenantsRequest {
    pub tenants: Vec<Tenant>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTenantsRequest {
    pub tenants: Vec<String>,
}

/// A command applied to a single class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    CreateClass {
        class: ClassMetadata,
        sharding: ShardingState,
    },
    /// Replace the schema, and optionally the sharding state, in one step.
    UpdateClass {
        class: ClassMetadata,
        #[serde(default)]
        sharding: Option<ShardingState>,
    },
    AddProperty {
        property: Property,
    },
    AddTenants(AddTenantsRequest),
    UpdateTenants(UpdateTenantsRequest),
    DeleteTenants(DeleteTenantsRequest),
    DropClass,
}

/// Discriminant of a [`Command`], used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    CreateClass,
    UpdateClass,
    AddProperty,
    AddTenants,
    UpdateTenants,
    DeleteTenants,
    DropClass,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::CreateClass { .. } => CommandKind::CreateClass,
            Command::UpdateClass { .. } => CommandKind::UpdateClass,
            Command::AddProperty { .. } => CommandKind::AddProperty,
            Command::AddTenants(_) => CommandKind::AddTenants,
            Command::UpdateTenants(_) => CommandKind::UpdateTenants,
            Command::DeleteTenants(_) => CommandKind::DeleteTenants,
            Command::DropClass => CommandKind::DropClass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tagged_commands() {
        let json = r#"
        [
          { "type": "add_tenants",
            "tenants": [ { "name": "T1", "status": "HOT", "nodes": ["N1", "N2"] } ] },
          { "type": "update_tenants",
            "tenants": [ { "name": "T1", "status": "COLD" } ] },
          { "type": "delete_tenants", "tenants": ["T1"] },
          { "type": "drop_class" }
        ]
        "#;

        let commands: Vec<Command> = serde_json::from_str(json).unwrap();
        let kinds: Vec<_> = commands.iter().map(Command::kind).collect();

        assert_eq!(
            kinds,
            vec![
                CommandKind::AddTenants,
                CommandKind::UpdateTenants,
                CommandKind::DeleteTenants,
                CommandKind::DropClass,
            ]
        );

        match &commands[1] {
            Command::UpdateTenants(req) => assert_eq!(req.tenants[0].nodes, None),
            other => panic!("unexpected command {other:?}"),
        }
    }
}

// Sharding State
//
// Partitioning layout of a class: which physical shards (or tenants)
// exist, their activity status and the nodes that own them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod placement;

pub use placement::{HashPlacement, ShardPlacement};

/// Activity status assumed when a shard carries none.
pub const STATUS_HOT: &str = "HOT";

/// One physical partition of a class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalShard {
    pub name: String,

    #[serde(default)]
    pub status: String,

    /// Owner nodes. Index 0 is the primary.
    #[serde(default, rename = "belongsToNodes")]
    pub belongs_to_nodes: Vec<String>,
}

impl PhysicalShard {
    pub fn new(name: impl Into<String>, status: impl Into<String>, nodes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            belongs_to_nodes: nodes,
        }
    }

    /// Status of the shard, `HOT` if none was recorded.
    pub fn activity_status(&self) -> &str {
        if self.status.is_empty() {
            STATUS_HOT
        } else {
            &self.status
        }
    }

    /// Primary owner, if the owner list is valid.
    pub fn primary(&self) -> Option<&str> {
        match self.belongs_to_nodes.first() {
            Some(node) if !node.is_empty() => Some(node),
            _ => None,
        }
    }

    pub fn is_owned_by(&self, node_id: &str) -> bool {
        self.belongs_to_nodes.iter().any(|n| n == node_id)
    }
}

/// Partitioning state of a class.
///
/// When partitioning is enabled every tenant maps to a shard of the same
/// name. Otherwise shard names are chosen by a [`ShardPlacement`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingState {
    #[serde(default, rename = "indexID")]
    pub index_id: String,

    #[serde(default, rename = "partitioningEnabled")]
    pub partitioning_enabled: bool,

    #[serde(default)]
    pub physical: BTreeMap<String, PhysicalShard>,
}

impl ShardingState {
    pub fn new(index_id: impl Into<String>, partitioning_enabled: bool) -> Self {
        Self {
            index_id: index_id.into(),
            partitioning_enabled,
            physical: BTreeMap::new(),
        }
    }

    pub fn shard(&self, name: &str) -> Option<&PhysicalShard> {
        self.physical.get(name)
    }

    /// Insert or replace a partition.
    pub fn add_partition(&mut self, shard: PhysicalShard) {
        self.physical.insert(shard.name.clone(), shard);
    }

    /// Remove a partition. Removing an unknown name is a no-op.
    pub fn delete_partition(&mut self, name: &str) -> Option<PhysicalShard> {
        self.physical.remove(name)
    }

    pub fn len(&self) -> usize {
        self.physical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.physical.is_empty()
    }
}

impl fmt::Display for PhysicalShard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) on [{}]",
            self.name,
            self.activity_status(),
            self.belongs_to_nodes.join(", ")
        )
    }
}

// Class Schema
//
// Schema definition of a single class (collection): its properties,
// multi-tenancy and replication settings.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single property of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,

    #[serde(default, rename = "dataType")]
    pub data_type: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: vec![data_type.into()],
            description: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTenancyConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    pub factor: i64,
}

/// Schema of one class.
///
/// `properties` is never mutated in place. Appending builds a new slice and
/// swaps the reference, so a clone taken earlier keeps seeing the old list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMetadata {
    pub class: String,

    #[serde(default = "no_properties")]
    pub properties: Arc<[Property]>,

    #[serde(
        default,
        rename = "multiTenancyConfig",
        skip_serializing_if = "Option::is_none"
    )]
    pub multi_tenancy_config: Option<MultiTenancyConfig>,

    #[serde(
        default,
        rename = "replicationConfig",
        skip_serializing_if = "Option::is_none"
    )]
    pub replication_config: Option<ReplicationConfig>,
}

fn no_properties() -> Arc<[Property]> {
    Arc::from(Vec::new())
}

impl ClassMetadata {
    /// Create an empty class with no properties and default settings.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: no_properties(),
            multi_tenancy_config: None,
            replication_config: None,
        }
    }

    pub fn with_multi_tenancy(mut self, enabled: bool) -> Self {
        self.multi_tenancy_config = Some(MultiTenancyConfig { enabled });
        self
    }

    pub fn with_replication_factor(mut self, factor: i64) -> Self {
        self.replication_config = Some(ReplicationConfig { factor });
        self
    }

    /// Replication factor in effect: the configured factor, or 1 when unset
    /// or not greater than 1.
    pub fn replication_factor(&self) -> usize {
        match self.replication_config {
            Some(cfg) if cfg.factor > 1 => cfg.factor as usize,
            _ => 1,
        }
    }

    /// Copy-on-write append.
    pub(crate) fn append_property(&mut self, property: Property) {
        let src = &self.properties;
        let mut dest = Vec::with_capacity(src.len() + 1);
        dest.extend_from_slice(src);
        dest.push(property);
        self.properties = Arc::from(dest);
    }
}

/// Read-only summary of a class, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    pub exists: bool,
    pub properties: usize,
    pub multi_tenancy: MultiTenancyConfig,
    pub replication_factor: usize,
    pub tenants: usize,
}

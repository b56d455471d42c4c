// Replay Configuration
//
// Identity of the local node and how replay reacts to failing commands.

use serde::{Deserialize, Serialize};

/// Replay configuration loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Node whose local work-list is computed.
    pub node_id: String,

    /// Stop at the first failing command instead of recording it.
    #[serde(default)]
    pub strict: bool,
}

impl ReplayConfig {
    /// Built-in configuration (used if no config is provided).
    pub fn default_config() -> Self {
        Self {
            node_id: "node-1".into(),
            strict: false,
        }
    }

    pub fn for_node(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Self::default_config()
        }
    }
}

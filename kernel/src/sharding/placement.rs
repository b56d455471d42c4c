// Shard Placement
//
// Maps an arbitrary key (usually object UUID bytes) to a physical shard
// name. The container only consumes this as an opaque function.

use std::fmt;

use super::ShardingState;

/// Placement function used to route keys when partitioning is disabled.
///
/// Implementations must be deterministic and total: every key maps to
/// some name, even if the name is empty.
pub trait ShardPlacement: Send + Sync + fmt::Debug {
    fn place(&self, key: &[u8], state: &ShardingState) -> String;
}

/// Default placement: FNV-1a hash of the key, modulo the ordered list of
/// physical shards. An empty table places every key on `""`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashPlacement;

impl HashPlacement {
    fn hash(key: &[u8]) -> u64 {
        let mut hash = 14695981039346656037u64;
        for byte in key {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        hash
    }
}

impl ShardPlacement for HashPlacement {
    fn place(&self, key: &[u8], state: &ShardingState) -> String {
        if state.physical.is_empty() {
            return String::new();
        }
        let slot = (Self::hash(key) % state.physical.len() as u64) as usize;
        state
            .physical
            .keys()
            .nth(slot)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharding::PhysicalShard;
    use uuid::Uuid;

    fn state(shards: &[&str]) -> ShardingState {
        let mut state = ShardingState::new("Article", false);
        for name in shards {
            state.add_partition(PhysicalShard::new(*name, "HOT", vec!["n1".into()]));
        }
        state
    }

    #[test]
    fn placement_is_deterministic() {
        let state = state(&["a", "b", "c"]);
        let key = Uuid::new_v4();

        let first = HashPlacement.place(key.as_bytes(), &state);
        let second = HashPlacement.place(key.as_bytes(), &state);

        assert_eq!(first, second);
        assert!(state.physical.contains_key(&first));
    }

    #[test]
    fn empty_table_places_on_empty_name() {
        let state = state(&[]);
        assert_eq!(HashPlacement.place(b"anything", &state), "");
    }
}

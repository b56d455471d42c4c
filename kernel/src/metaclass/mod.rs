// Class Metadata Container
//
// Owns the schema and sharding state of one class behind a single
// read/write lock. Consensus-applied commands mutate it; routing code
// queries it. Nothing returned from here aliases the guarded state.

use parking_lot::RwLock;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::schema::{ClassInfo, ClassMetadata, MultiTenancyConfig, Property};
use crate::sharding::{HashPlacement, PhysicalShard, ShardPlacement, ShardingState};

mod tenants;

pub use tenants::{TenantEntry, TenantOutcome, TenantReport, TenantUpdate};

/// Errors surfaced by class metadata lookups and tenant updates.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MetaError {
    #[error("shard not found: {0}")]
    ShardNotFound(String),

    #[error("owner node not found for shard {0}")]
    OwnerNotFound(String),

    #[error("shard not found: {0:?}")]
    TenantsNotFound(Vec<String>),
}

impl MetaError {
    /// True for both the single and the aggregated not-found error.
    pub fn is_shard_not_found(&self) -> bool {
        matches!(self, MetaError::ShardNotFound(_) | MetaError::TenantsNotFound(_))
    }
}

#[derive(Debug)]
struct ClassState {
    class: ClassMetadata,
    sharding: ShardingState,
}

/// Tenant name, status and owners, as listed by [`MetaClass::tenants`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantInfo {
    pub name: String,
    pub status: String,
    pub nodes: Vec<String>,
}

/// Metadata container of a single class.
#[derive(Debug)]
pub struct MetaClass {
    state: RwLock<ClassState>,
    placement: Arc<dyn ShardPlacement>,
}

impl MetaClass {
    /// Create a container using the default [`HashPlacement`].
    pub fn new(class: ClassMetadata, sharding: ShardingState) -> Self {
        Self::with_placement(class, sharding, Arc::new(HashPlacement))
    }

    pub fn with_placement(
        class: ClassMetadata,
        sharding: ShardingState,
        placement: Arc<dyn ShardPlacement>,
    ) -> Self {
        Self {
            state: RwLock::new(ClassState { class, sharding }),
            placement,
        }
    }

    // ------------------------------------------------------------
    // Mutation gateway
    // ------------------------------------------------------------

    /// Run `mutator` while holding the write lock.
    ///
    /// No reader observes the state between the mutator's individual
    /// writes. The mutator's error is returned unchanged.
    pub fn lock_guard<T, E, F>(&self, mutator: F) -> Result<T, E>
    where
        F: FnOnce(&mut ClassMetadata, &mut ShardingState) -> Result<T, E>,
    {
        let mut guard = self.state.write();
        let ClassState { class, sharding } = &mut *guard;
        mutator(class, sharding)
    }

    /// Run `reader` while holding the read lock.
    pub fn rlock_guard<T, E, F>(&self, reader: F) -> Result<T, E>
    where
        F: FnOnce(&ClassMetadata, &ShardingState) -> Result<T, E>,
    {
        let guard = self.state.read();
        reader(&guard.class, &guard.sharding)
    }

    // ------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------

    /// Consistent summary of the class, read under a single lock.
    pub fn class_info(&self) -> ClassInfo {
        let guard = self.state.read();
        ClassInfo {
            exists: true,
            properties: guard.class.properties.len(),
            multi_tenancy: guard.class.multi_tenancy_config.unwrap_or_default(),
            replication_factor: guard.class.replication_factor(),
            tenants: guard.sharding.len(),
        }
    }

    pub fn multi_tenancy_config(&self) -> MultiTenancyConfig {
        self.state.read().class.multi_tenancy_config.unwrap_or_default()
    }

    /// Shallow copy of the schema. The property slice is shared with the
    /// container but is never modified in place.
    pub fn clone_class(&self) -> ClassMetadata {
        self.state.read().class.clone()
    }

    /// Append a property. Duplicate names are not checked here.
    pub fn add_property(&self, property: Property) {
        let name = property.name.clone();
        let class = {
            let mut guard = self.state.write();
            guard.class.append_property(property);
            guard.class.class.clone()
        };
        debug!(class = %class, property = %name, "added property");
    }

    // ------------------------------------------------------------
    // Sharding queries
    // ------------------------------------------------------------

    /// Primary owner of `shard`.
    pub fn shard_owner(&self, shard: &str) -> Result<String, MetaError> {
        let guard = self.state.read();
        let physical = guard
            .sharding
            .shard(shard)
            .ok_or_else(|| MetaError::ShardNotFound(shard.to_string()))?;
        physical
            .primary()
            .map(str::to_string)
            .ok_or_else(|| MetaError::OwnerNotFound(shard.to_string()))
    }

    /// Shard a key is placed on.
    pub fn shard_from_uuid(&self, key: &[u8]) -> String {
        let guard = self.state.read();
        self.placement.place(key, &guard.sharding)
    }

    pub fn shard_for_uuid(&self, id: &Uuid) -> String {
        self.shard_from_uuid(id.as_bytes())
    }

    /// Replica nodes of `shard`, primary first.
    pub fn shard_replicas(&self, shard: &str) -> Result<Vec<String>, MetaError> {
        let guard = self.state.read();
        guard
            .sharding
            .shard(shard)
            .map(|physical| physical.belongs_to_nodes.clone())
            .ok_or_else(|| MetaError::ShardNotFound(shard.to_string()))
    }

    /// Shard name and activity status of `tenant`.
    ///
    /// Returns empty strings when partitioning is disabled or the tenant
    /// is unknown.
    pub fn tenant_shard(&self, tenant: &str) -> (String, String) {
        let guard = self.state.read();
        if !guard.sharding.partitioning_enabled {
            return (String::new(), String::new());
        }
        match guard.sharding.shard(tenant) {
            Some(physical) => (tenant.to_string(), physical.activity_status().to_string()),
            None => (String::new(), String::new()),
        }
    }

    pub fn copy_sharding_state(&self) -> ShardingState {
        self.state.read().sharding.clone()
    }

    /// List tenants by name. An empty filter lists all of them; unknown
    /// names are skipped.
    pub fn tenants(&self, names: &[String]) -> Vec<TenantInfo> {
        let listed: Result<Vec<TenantInfo>, Infallible> = self.rlock_guard(|_, sharding| {
            let info = |shard: &PhysicalShard| TenantInfo {
                name: shard.name.clone(),
                status: shard.activity_status().to_string(),
                nodes: shard.belongs_to_nodes.clone(),
            };
            if names.is_empty() {
                return Ok(sharding.physical.values().map(info).collect());
            }
            Ok(names
                .iter()
                .filter_map(|name| sharding.shard(name))
                .map(info)
                .collect())
        });
        match listed {
            Ok(tenants) => tenants,
            Err(never) => match never {},
        }
    }
}

/// Read-only queries on a class that may not exist.
///
/// An absent class answers with zero values instead of failing, so callers
/// can query without checking existence first.
pub trait ClassLookup {
    fn class_info(&self) -> ClassInfo;
    fn multi_tenancy_config(&self) -> MultiTenancyConfig;
    fn tenant_shard(&self, tenant: &str) -> (String, String);
    fn shard_from_uuid(&self, key: &[u8]) -> String;
}

impl ClassLookup for Option<&MetaClass> {
    fn class_info(&self) -> ClassInfo {
        self.map(MetaClass::class_info).unwrap_or_default()
    }

    fn multi_tenancy_config(&self) -> MultiTenancyConfig {
        self.map(MetaClass::multi_tenancy_config).unwrap_or_default()
    }

    fn tenant_shard(&self, tenant: &str) -> (String, String) {
        self.map(|m| m.tenant_shard(tenant)).unwrap_or_default()
    }

    fn shard_from_uuid(&self, key: &[u8]) -> String {
        self.map(|m| m.shard_from_uuid(key)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{AddTenantsRequest, Tenant};
    use std::thread;

    fn partitioned(shards: Vec<PhysicalShard>) -> MetaClass {
        let class = ClassMetadata::new("Article").with_multi_tenancy(true);
        let mut sharding = ShardingState::new("Article", true);
        for shard in shards {
            sharding.add_partition(shard);
        }
        MetaClass::new(class, sharding)
    }

    fn nodes(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn class_info_reflects_schema_and_tenants() {
        let meta = partitioned(vec![
            PhysicalShard::new("T1", "HOT", nodes(&["N1"])),
            PhysicalShard::new("T2", "HOT", nodes(&["N2"])),
        ]);
        meta.add_property(Property::new("title", "text"));

        let info = meta.class_info();

        assert!(info.exists);
        assert_eq!(info.properties, 1);
        assert!(info.multi_tenancy.enabled);
        assert_eq!(info.replication_factor, 1);
        assert_eq!(info.tenants, 2);
    }

    #[test]
    fn absent_class_answers_with_zero_values() {
        let missing: Option<&MetaClass> = None;

        assert_eq!(missing.class_info(), ClassInfo::default());
        assert!(!missing.class_info().exists);
        assert_eq!(missing.multi_tenancy_config(), MultiTenancyConfig::default());
        assert_eq!(missing.tenant_shard("T1"), (String::new(), String::new()));
        assert_eq!(missing.shard_from_uuid(b"key"), "");
    }

    #[test]
    fn present_class_through_lookup() {
        let meta = partitioned(vec![PhysicalShard::new("T1", "HOT", nodes(&["N1"]))]);
        let found = Some(&meta);

        assert!(found.class_info().exists);
        assert_eq!(found.tenant_shard("T1"), ("T1".to_string(), "HOT".to_string()));
    }

    #[test]
    fn shard_owner_returns_primary() {
        let meta = partitioned(vec![PhysicalShard::new(
            "S1",
            "HOT",
            nodes(&["node-b", "node-c"]),
        )]);

        assert_eq!(meta.shard_owner("S1").unwrap(), "node-b");
    }

    #[test]
    fn shard_owner_rejects_missing_shard_and_owner() {
        let meta = partitioned(vec![
            PhysicalShard::new("empty", "HOT", vec![]),
            PhysicalShard::new("blank", "HOT", nodes(&["", "N2"])),
        ]);

        assert_eq!(
            meta.shard_owner("nope").unwrap_err(),
            MetaError::ShardNotFound("nope".into())
        );
        assert_eq!(
            meta.shard_owner("empty").unwrap_err(),
            MetaError::OwnerNotFound("empty".into())
        );
        assert_eq!(
            meta.shard_owner("blank").unwrap_err(),
            MetaError::OwnerNotFound("blank".into())
        );
    }

    #[test]
    fn shard_replicas_returns_a_copy() {
        let meta = partitioned(vec![PhysicalShard::new("S1", "HOT", nodes(&["N1", "N2"]))]);

        let mut replicas = meta.shard_replicas("S1").unwrap();
        replicas.push("N3".into());
        replicas[0] = "changed".into();

        assert_eq!(meta.shard_replicas("S1").unwrap(), nodes(&["N1", "N2"]));
        assert!(meta.shard_replicas("S2").unwrap_err().is_shard_not_found());
    }

    #[test]
    fn tenant_shard_depends_on_partitioning() {
        let meta = partitioned(vec![PhysicalShard::new("T1", "HOT", nodes(&["N1"]))]);
        assert_eq!(meta.tenant_shard("T1"), ("T1".to_string(), "HOT".to_string()));
        assert_eq!(meta.tenant_shard("T9"), (String::new(), String::new()));

        meta.lock_guard(|_, sharding| {
            sharding.partitioning_enabled = false;
            Ok::<_, MetaError>(())
        })
        .unwrap();

        assert_eq!(meta.tenant_shard("T1"), (String::new(), String::new()));
    }

    #[test]
    fn shard_from_uuid_uses_placement() {
        #[derive(Debug)]
        struct Fixed;

        impl ShardPlacement for Fixed {
            fn place(&self, _key: &[u8], state: &ShardingState) -> String {
                format!("{}-fixed", state.index_id)
            }
        }

        let meta = MetaClass::with_placement(
            ClassMetadata::new("Article"),
            ShardingState::new("Article", false),
            Arc::new(Fixed),
        );

        assert_eq!(meta.shard_for_uuid(&Uuid::new_v4()), "Article-fixed");
    }

    #[test]
    fn copy_sharding_state_is_detached() {
        let meta = partitioned(vec![PhysicalShard::new("T1", "HOT", nodes(&["N1"]))]);

        let mut copy = meta.copy_sharding_state();
        copy.delete_partition("T1");

        assert_eq!(meta.class_info().tenants, 1);
    }

    #[test]
    fn clone_class_keeps_old_property_list() {
        let meta = partitioned(vec![]);
        meta.add_property(Property::new("title", "text"));

        let snapshot = meta.clone_class();
        meta.add_property(Property::new("body", "text"));

        assert_eq!(snapshot.properties.len(), 1);
        assert_eq!(meta.clone_class().properties.len(), 2);
    }

    #[test]
    fn readers_never_see_partial_property_list() {
        let meta = partitioned(vec![]);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..500 {
                        let class = meta.clone_class();
                        for (i, p) in class.properties.iter().enumerate() {
                            assert_eq!(p.name, format!("p{i}"));
                        }
                        let info = meta.class_info();
                        assert!(info.properties >= class.properties.len());
                    }
                });
            }

            s.spawn(|| {
                for i in 0..200 {
                    meta.add_property(Property::new(format!("p{i}"), "int"));
                }
            });
        });

        assert_eq!(meta.class_info().properties, 200);
    }

    #[test]
    fn lock_guard_applies_compound_mutation_atomically() {
        let meta = partitioned(vec![]);

        meta.lock_guard(|class, sharding| {
            class.replication_config = Some(crate::schema::ReplicationConfig { factor: 3 });
            sharding.add_partition(PhysicalShard::new("T1", "HOT", nodes(&["N1"])));
            Ok::<_, MetaError>(())
        })
        .unwrap();

        let (factor, tenants) = meta
            .rlock_guard(|class, sharding| {
                Ok::<_, MetaError>((class.replication_factor(), sharding.len()))
            })
            .unwrap();

        assert_eq!((factor, tenants), (3, 1));
    }

    #[test]
    fn guard_errors_propagate_and_release_lock() {
        let meta = partitioned(vec![]);

        let err = meta
            .lock_guard(|_, _| Err::<(), _>(MetaError::ShardNotFound("x".into())))
            .unwrap_err();
        assert_eq!(err, MetaError::ShardNotFound("x".into()));

        let err = meta
            .rlock_guard(|_, _| Err::<(), _>("reader failed"))
            .unwrap_err();
        assert_eq!(err, "reader failed");

        // lock is free again
        meta.add_tenants(
            "N1",
            &AddTenantsRequest {
                tenants: vec![Tenant::new("T1", "HOT").on_nodes(["N1"])],
            },
        );
        assert_eq!(meta.class_info().tenants, 1);
    }

    #[test]
    fn tenants_lists_requested_names() {
        let meta = partitioned(vec![
            PhysicalShard::new("T1", "", nodes(&["N1"])),
            PhysicalShard::new("T2", "COLD", nodes(&["N2"])),
        ]);

        let all = meta.tenants(&[]);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].status, "HOT");

        let some = meta.tenants(&["T2".to_string(), "T9".to_string()]);
        assert_eq!(
            some,
            vec![TenantInfo {
                name: "T2".into(),
                status: "COLD".into(),
                nodes: nodes(&["N2"]),
            }]
        );
    }
}

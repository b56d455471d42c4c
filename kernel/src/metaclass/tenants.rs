// Tenant Lifecycle
//
// Add, update and delete tenants of a partitioned class. Add and update
// report, per requested tenant, whether the local node has work to do.

use serde::Serialize;
use tracing::{debug, warn};

use super::{MetaClass, MetaError};
use crate::command::{AddTenantsRequest, DeleteTenantsRequest, Tenant, UpdateTenantsRequest};
use crate::sharding::PhysicalShard;

/// What happened to one requested tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantOutcome {
    /// State changed and the local node owns the tenant.
    Applied,

    /// The tenant already existed; nothing was written.
    AlreadyExists,

    /// State changed, but the tenant lives on other nodes.
    NotOwned,

    /// Requested status equals the current one.
    Unchanged,

    /// Update of a tenant that does not exist.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantEntry {
    pub tenant: Tenant,
    pub outcome: TenantOutcome,
}

/// Per-tenant outcomes of a batch, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TenantReport {
    pub entries: Vec<TenantEntry>,
}

impl TenantReport {
    /// Tenants the local node must act on.
    pub fn actionable(&self) -> impl Iterator<Item = &Tenant> {
        self.entries
            .iter()
            .filter(|e| e.outcome == TenantOutcome::Applied)
            .map(|e| &e.tenant)
    }

    pub fn into_actionable(self) -> Vec<Tenant> {
        self.entries
            .into_iter()
            .filter(|e| e.outcome == TenantOutcome::Applied)
            .map(|e| e.tenant)
            .collect()
    }

    pub fn outcome(&self, name: &str) -> Option<TenantOutcome> {
        self.entries
            .iter()
            .find(|e| e.tenant.name == name)
            .map(|e| e.outcome)
    }

    pub fn names_with(&self, outcome: TenantOutcome) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.outcome == outcome)
            .map(|e| e.tenant.name.as_str())
            .collect()
    }
}

/// Result of an update batch.
///
/// `changed` counts records written, including ones tagged `NotOwned`.
#[must_use = "missing tenants are only reported through `result()`"]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TenantUpdate {
    pub changed: usize,
    pub report: TenantReport,
}

impl TenantUpdate {
    pub fn missing(&self) -> Vec<&str> {
        self.report.names_with(TenantOutcome::Missing)
    }

    /// Fails with every missing tenant name. Entries that were found stay
    /// applied either way.
    pub fn result(&self) -> Result<(), MetaError> {
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(());
        }
        Err(MetaError::TenantsNotFound(
            missing.into_iter().map(str::to_string).collect(),
        ))
    }
}

impl MetaClass {
    /// Insert the requested tenants that do not exist yet.
    ///
    /// Tenants that already exist are left untouched. New tenants not owned
    /// by `node_id` are inserted but reported as `NotOwned`.
    pub fn add_tenants(&self, node_id: &str, req: &AddTenantsRequest) -> TenantReport {
        let mut entries = Vec::with_capacity(req.tenants.len());
        let index_id = {
            let mut guard = self.state.write();
            let sharding = &mut guard.sharding;
            for tenant in &req.tenants {
                let outcome = if sharding.physical.contains_key(&tenant.name) {
                    TenantOutcome::AlreadyExists
                } else {
                    let nodes = tenant.nodes.clone().unwrap_or_default();
                    let shard =
                        PhysicalShard::new(tenant.name.clone(), tenant.status.clone(), nodes);
                    let owned = shard.is_owned_by(node_id);
                    sharding.add_partition(shard);
                    if owned {
                        TenantOutcome::Applied
                    } else {
                        TenantOutcome::NotOwned
                    }
                };
                entries.push(TenantEntry {
                    tenant: tenant.clone(),
                    outcome,
                });
            }
            sharding.index_id.clone()
        };

        let report = TenantReport { entries };
        debug!(
            index = %index_id,
            node = node_id,
            requested = req.tenants.len(),
            local = report.actionable().count(),
            "added tenants"
        );
        report
    }

    /// Change status (and optionally owners) of existing tenants.
    ///
    /// Missing tenants do not stop the batch; they are collected and
    /// surface through [`TenantUpdate::result`].
    pub fn update_tenants(&self, node_id: &str, req: &UpdateTenantsRequest) -> TenantUpdate {
        let mut changed = 0;
        let mut entries = Vec::with_capacity(req.tenants.len());
        let index_id = {
            let mut guard = self.state.write();
            let sharding = &mut guard.sharding;
            for tenant in &req.tenants {
                let outcome = match sharding.physical.get_mut(&tenant.name) {
                    None => TenantOutcome::Missing,
                    Some(current) if current.activity_status() == tenant.status => {
                        TenantOutcome::Unchanged
                    }
                    Some(current) => {
                        let mut updated = current.clone();
                        updated.status = tenant.status.clone();
                        if let Some(nodes) = &tenant.nodes {
                            updated.belongs_to_nodes = nodes.clone();
                        }
                        let owned = updated.is_owned_by(node_id);
                        *current = updated;
                        changed += 1;
                        if owned {
                            TenantOutcome::Applied
                        } else {
                            TenantOutcome::NotOwned
                        }
                    }
                };
                entries.push(TenantEntry {
                    tenant: tenant.clone(),
                    outcome,
                });
            }
            sharding.index_id.clone()
        };

        let update = TenantUpdate {
            changed,
            report: TenantReport { entries },
        };
        let missing = update.missing();
        if !missing.is_empty() {
            warn!(index = %index_id, ?missing, "update of unknown tenants");
        }
        debug!(index = %index_id, node = node_id, changed, "updated tenants");
        update
    }

    /// Remove tenants. Unknown names are ignored.
    pub fn delete_tenants(&self, req: &DeleteTenantsRequest) {
        let (index_id, removed) = {
            let mut guard = self.state.write();
            let removed: Vec<PhysicalShard> = req
                .tenants
                .iter()
                .filter_map(|name| guard.sharding.delete_partition(name))
                .collect();
            (guard.sharding.index_id.clone(), removed)
        };

        for shard in &removed {
            debug!(index = %index_id, %shard, "deleted tenant");
        }
    }
}

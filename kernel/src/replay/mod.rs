// Command Replay
//
// Applies committed class commands, in log order, to the class container
// and records which tenants the local node must act on.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandKind};
use crate::config::ReplayConfig;
use crate::log::{CommandLog, Index};
use crate::metaclass::{MetaClass, MetaError};

/// Errors produced while applying a single command.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("class not found")]
    ClassNotFound,

    #[error("class {0} already exists")]
    ClassAlreadyExists(String),

    #[error("class name mismatch: expected {expected}, got {actual}")]
    ClassMismatch { expected: String, actual: String },

    /// Some tenants of an update batch were missing. The rest were written
    /// and `applied` carries their local work.
    #[error("{source}")]
    PartialUpdate { applied: Applied, source: MetaError },
}

impl ApplyError {
    /// Work that was applied before the command failed.
    pub fn applied(&self) -> Option<&Applied> {
        match self {
            ApplyError::PartialUpdate { applied, .. } => Some(applied),
            _ => None,
        }
    }
}

/// Errors that abort a strict replay.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("command {index} failed: {source}")]
    Apply { index: Index, source: ApplyError },
}

/// Local effect of one applied command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Applied {
    /// Tenants this node must provision or reconfigure.
    pub local: Vec<String>,

    /// Records written by a tenant update.
    pub changed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedEntry {
    pub index: Index,
    pub kind: CommandKind,
    #[serde(flatten)]
    pub applied: Applied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub index: Index,
    pub kind: CommandKind,
    pub error: String,
    #[serde(flatten)]
    pub applied: Applied,
}

/// Final state of a replay.
#[derive(Debug)]
pub struct ReplayOutcome {
    /// The class, if it exists after the last command.
    pub class: Option<MetaClass>,
    pub applied: Vec<AppliedEntry>,
    pub failures: Vec<FailedEntry>,
}

/// Apply one command to a class slot.
///
/// `CreateClass` fills the slot and `DropClass` empties it; every other
/// command needs an existing class.
pub fn apply_command(
    slot: &mut Option<MetaClass>,
    node_id: &str,
    command: &Command,
) -> Result<Applied, ApplyError> {
    match command {
        Command::CreateClass { class, sharding } => {
            if let Some(existing) = slot.as_ref() {
                return Err(ApplyError::ClassAlreadyExists(existing.clone_class().class));
            }
            info!(class = %class.class, tenants = sharding.len(), "creating class");
            *slot = Some(MetaClass::new(class.clone(), sharding.clone()));
            Ok(Applied::default())
        }
        Command::DropClass => {
            if let Some(dropped) = slot.take() {
                info!(class = %dropped.clone_class().class, "dropped class");
            }
            Ok(Applied::default())
        }
        Command::UpdateClass { class, sharding } => {
            existing(slot)?.lock_guard(|current, state| {
                if current.class != class.class {
                    return Err(ApplyError::ClassMismatch {
                        expected: current.class.clone(),
                        actual: class.class.clone(),
                    });
                }
                *current = class.clone();
                if let Some(sharding) = sharding {
                    *state = sharding.clone();
                }
                Ok(())
            })?;
            Ok(Applied::default())
        }
        Command::AddProperty { property } => {
            existing(slot)?.add_property(property.clone());
            Ok(Applied::default())
        }
        Command::AddTenants(req) => {
            let report = existing(slot)?.add_tenants(node_id, req);
            Ok(Applied {
                local: report.into_actionable().into_iter().map(|t| t.name).collect(),
                changed: 0,
            })
        }
        Command::UpdateTenants(req) => {
            let update = existing(slot)?.update_tenants(node_id, req);
            let applied = Applied {
                local: update.report.actionable().map(|t| t.name.clone()).collect(),
                changed: update.changed,
            };
            match update.result() {
                Ok(()) => Ok(applied),
                Err(source) => Err(ApplyError::PartialUpdate { applied, source }),
            }
        }
        Command::DeleteTenants(req) => {
            existing(slot)?.delete_tenants(req);
            Ok(Applied {
                local: req.tenants.clone(),
                changed: 0,
            })
        }
    }
}

fn existing(slot: &Option<MetaClass>) -> Result<&MetaClass, ApplyError> {
    slot.as_ref().ok_or(ApplyError::ClassNotFound)
}

/// Replay the command log and derive the final class state.
pub fn replay_class(log: &CommandLog, config: &ReplayConfig) -> Result<ReplayOutcome, ReplayError> {
    let mut slot = None;
    let mut applied = Vec::new();
    let mut failures = Vec::new();

    for entry in log.replay() {
        let kind = entry.command.kind();
        match apply_command(&mut slot, &config.node_id, &entry.command) {
            Ok(result) => {
                debug!(index = entry.index, ?kind, local = result.local.len(), "applied command");
                applied.push(AppliedEntry {
                    index: entry.index,
                    kind,
                    applied: result,
                });
            }
            Err(source) if config.strict => {
                return Err(ReplayError::Apply {
                    index: entry.index,
                    source,
                })
            }
            Err(err) => {
                warn!(index = entry.index, ?kind, error = %err, "command failed");
                failures.push(FailedEntry {
                    index: entry.index,
                    kind,
                    error: err.to_string(),
                    applied: err.applied().cloned().unwrap_or_default(),
                });
            }
        }
    }

    Ok(ReplayOutcome {
        class: slot,
        applied,
        failures,
    })
}

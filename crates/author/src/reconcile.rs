use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use worldhub_common::ProjectId;
use worldhub_kernel::{ProjectDefinition, ProjectError, ProjectRecord};
use worldhub_persist::{RecordStore, StoreError};

/// Which side wins when a loaded definition and an existing record share an id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// The freshly loaded definition replaces the record.
    #[default]
    DefinitionWins,
    /// An existing record replaces the definition with the same id, so admin
    /// edits survive reconciliation. Records whose ids are absent from the
    /// loaded set are still dropped.
    RecordWins,
}

/// Why a definition was left out of the committed collection.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// An earlier definition already claimed this id.
    DuplicateId,
    /// An earlier definition with another id already claimed this name.
    DuplicateName { existing: ProjectId },
    /// The definition failed validation.
    Invalid(ProjectError),
}

/// A discarded definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub id: ProjectId,
    pub name: String,
    pub reason: RejectReason,
}

/// Result of reconciling a batch of definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// The collection to commit, in encountered order.
    pub accepted: Vec<ProjectRecord>,
    /// Definitions discarded, in encountered order.
    pub rejected: Vec<Rejection>,
    /// Ids for which an existing record was kept over its definition.
    pub kept_records: Vec<ProjectId>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("duplicate identity survived reconciliation: {0}")]
    DuplicateIdentity(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Merge `definitions` into a new record collection.
///
/// Definitions are walked in order: invalid ones are dropped, then the first
/// definition for each id wins, then the first definition for each name wins.
/// `policy` decides whether matching `current` records replace accepted
/// definitions. Pure: nothing is written.
pub fn reconcile(
    definitions: Vec<ProjectDefinition>,
    current: &[ProjectRecord],
    policy: ConflictPolicy,
) -> Result<Reconciliation, ReconcileError> {
    let mut out = Reconciliation::default();
    let mut ids = HashSet::new();
    let mut names: HashMap<String, ProjectId> = HashMap::new();

    for definition in definitions {
        let reason = if let Err(e) = definition.validate() {
            Some(RejectReason::Invalid(e))
        } else if ids.contains(&definition.id) {
            Some(RejectReason::DuplicateId)
        } else {
            names
                .get(&name_key(&definition.name))
                .map(|&existing| RejectReason::DuplicateName { existing })
        };

        match reason {
            Some(reason) => {
                warn!(id = %definition.id, name = %definition.name, ?reason, "discarding definition");
                out.rejected.push(Rejection {
                    id: definition.id,
                    name: definition.name,
                    reason,
                });
            }
            None => {
                ids.insert(definition.id);
                names.insert(name_key(&definition.name), definition.id);
                out.accepted.push(definition);
            }
        }
    }

    if policy == ConflictPolicy::RecordWins {
        apply_record_wins(&mut out, current, &mut names);
    }

    verify_unique(&out.accepted)?;
    Ok(out)
}

fn apply_record_wins(
    out: &mut Reconciliation,
    current: &[ProjectRecord],
    names: &mut HashMap<String, ProjectId>,
) {
    let by_id: HashMap<ProjectId, &ProjectRecord> = current.iter().map(|r| (r.id, r)).collect();
    for slot in &mut out.accepted {
        let Some(&record) = by_id.get(&slot.id) else {
            continue;
        };
        if record == slot {
            continue;
        }
        let key = name_key(&record.name);
        let clash = names.get(&key).is_some_and(|&owner| owner != record.id);
        if clash || record.validate().is_err() {
            warn!(id = %record.id, name = %record.name, "stored record conflicts; keeping definition");
            continue;
        }
        names.remove(&name_key(&slot.name));
        names.insert(key, record.id);
        *slot = record.clone();
        out.kept_records.push(record.id);
    }
}

/// Re-check that `records` holds no duplicate id or name.
fn verify_unique(records: &[ProjectRecord]) -> Result<(), ReconcileError> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for record in records {
        if !ids.insert(record.id) {
            return Err(ReconcileError::DuplicateIdentity(format!("id {}", record.id)));
        }
        if !names.insert(name_key(&record.name)) {
            return Err(ReconcileError::DuplicateIdentity(format!(
                "name {:?}",
                record.name
            )));
        }
    }
    Ok(())
}

/// Commits reconciled definitions to a [`RecordStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    policy: ConflictPolicy,
}

impl Reconciler {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Reconcile against the store's current records and replace its whole
    /// collection with the result, under the store's writer lock.
    pub async fn commit(
        &self,
        store: &RecordStore,
        definitions: Vec<ProjectDefinition>,
    ) -> Result<Reconciliation, ReconcileError> {
        let policy = self.policy;
        let result = store
            .update(|records| {
                let result = reconcile(definitions, records, policy)?;
                records.clone_from(&result.accepted);
                Ok::<_, ReconcileError>(result)
            })
            .await?;
        info!(
            accepted = result.accepted.len(),
            rejected = result.rejected.len(),
            kept_records = result.kept_records.len(),
            ?policy,
            "reconciliation committed"
        );
        Ok(result)
    }
}

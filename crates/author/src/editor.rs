use tracing::info;
use worldhub_common::ProjectId;
use worldhub_kernel::{ProjectError, ProjectRecord};
use worldhub_persist::{RecordStore, StoreError};

/// Errors from admin record edits.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("project {0} not found")]
    NotFound(ProjectId),
    #[error("name {name:?} is already used by project {existing}")]
    DuplicateIdentity { name: String, existing: ProjectId },
    #[error(transparent)]
    Invalid(#[from] ProjectError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Whether a save inserted a new record or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// Admin edits against a [`RecordStore`].
///
/// Every edit is a read-modify-write of the full collection under the store's
/// writer lock, and keeps ids and names unique.
pub struct RecordEditor<'a> {
    store: &'a RecordStore,
}

impl<'a> RecordEditor<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Insert `record`, or replace the record with the same id in place.
    pub async fn save(&self, record: ProjectRecord) -> Result<SaveOutcome, EditError> {
        record.validate()?;
        let id = record.id;
        let outcome = self
            .store
            .update(|records| {
                let key = record.name.trim().to_lowercase();
                if let Some(other) = records
                    .iter()
                    .find(|r| r.id != record.id && r.name.trim().to_lowercase() == key)
                {
                    return Err(EditError::DuplicateIdentity {
                        name: record.name.clone(),
                        existing: other.id,
                    });
                }
                match records.iter_mut().find(|r| r.id == record.id) {
                    Some(slot) => {
                        *slot = record;
                        Ok(SaveOutcome::Updated)
                    }
                    None => {
                        records.push(record);
                        Ok(SaveOutcome::Created)
                    }
                }
            })
            .await?;
        info!(%id, ?outcome, "project record saved");
        Ok(outcome)
    }

    /// Remove the record with `id`, returning it.
    pub async fn delete(&self, id: ProjectId) -> Result<ProjectRecord, EditError> {
        let removed = self
            .store
            .update(|records| {
                let index = records
                    .iter()
                    .position(|r| r.id == id)
                    .ok_or(EditError::NotFound(id))?;
                Ok::<_, EditError>(records.remove(index))
            })
            .await?;
        info!(%id, "project record deleted");
        Ok(removed)
    }
}

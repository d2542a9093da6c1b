//! Project record store: primary collection, byte-identical backup, in-memory copy.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use worldhub_common::ProjectId;
use worldhub_kernel::ProjectRecord;

use crate::codec::{StoreError, decode, encode, sha256_hex};
use crate::kv::KeyValueStore;

/// Keys under which the record collection and its backup are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKeys {
    pub primary: String,
    pub backup: String,
}

impl Default for RecordKeys {
    fn default() -> Self {
        Self {
            primary: "projects".into(),
            backup: "projects.backup".into(),
        }
    }
}

/// The persisted, admin-editable collection of project records.
///
/// Writers are serialized and always write the full collection: first the
/// primary key, then the same bytes under the backup key. Reads are served
/// from an in-memory copy that is only replaced after both writes succeed.
pub struct RecordStore {
    backend: Arc<dyn KeyValueStore>,
    keys: RecordKeys,
    records: RwLock<Vec<ProjectRecord>>,
    writer: Mutex<()>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, keys: RecordKeys) -> Self {
        Self {
            backend,
            keys,
            records: RwLock::new(Vec::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn keys(&self) -> &RecordKeys {
        &self.keys
    }

    /// Load the persisted collection into memory and return it.
    ///
    /// A corrupt or missing primary is recovered from the backup (and the
    /// primary rewritten). If neither copy is readable the store is empty.
    pub async fn load(&self) -> Vec<ProjectRecord> {
        let _guard = self.writer.lock().await;
        let records = self.load_recovering().await;
        *self.records.write().await = records.clone();
        info!(count = records.len(), "project records loaded");
        records
    }

    async fn load_recovering(&self) -> Vec<ProjectRecord> {
        let primary_bytes = match self.backend.get(&self.keys.primary).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %self.keys.primary, error = %e, "primary record read failed");
                None
            }
        };
        let backup_bytes = match self.backend.get(&self.keys.backup).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %self.keys.backup, error = %e, "backup record read failed");
                None
            }
        };

        if let Some(bytes) = &primary_bytes {
            match decode::<ProjectRecord>(&self.keys.primary, bytes) {
                Ok(records) => {
                    let backup = backup_bytes.as_deref();
                    if backup != Some(bytes.as_slice()) {
                        warn!(
                            key = %self.keys.backup,
                            primary = %sha256_hex(bytes),
                            backup = %backup.map(sha256_hex).unwrap_or_default(),
                            "record backup diverges from primary; rewriting backup"
                        );
                        if let Err(e) = self.backend.put(&self.keys.backup, bytes).await {
                            warn!(error = %e, "record backup rewrite failed");
                        }
                    }
                    return records;
                }
                Err(e) => warn!(error = %e, "primary record collection unreadable; trying backup"),
            }
        }

        let Some(bytes) = &backup_bytes else {
            if primary_bytes.is_some() {
                error!("no usable record collection; starting empty");
            } else {
                debug!("no persisted record collection");
            }
            return Vec::new();
        };
        match decode::<ProjectRecord>(&self.keys.backup, bytes) {
            Ok(records) => {
                warn!(count = records.len(), "restoring project records from backup");
                if let Err(e) = self.backend.put(&self.keys.primary, bytes).await {
                    warn!(error = %e, "primary record restore failed");
                }
                records
            }
            Err(e) => {
                error!(error = %e, "record backup unreadable as well; starting empty");
                Vec::new()
            }
        }
    }

    /// Snapshot of all records, in stored order.
    pub async fn all(&self) -> Vec<ProjectRecord> {
        self.records.read().await.clone()
    }

    pub async fn get(&self, id: ProjectId) -> Option<ProjectRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// First record whose name or custom link matches `query`.
    pub async fn find_by_name(&self, query: &str) -> Option<ProjectRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.matches_name_or_link(query))
            .cloned()
    }

    /// Replace the whole collection.
    pub async fn replace_all(&self, records: Vec<ProjectRecord>) -> Result<(), StoreError> {
        let _guard = self.writer.lock().await;
        self.write_locked(records).await
    }

    /// Read-modify-write the collection under the writer lock.
    ///
    /// Edits apply to the in-memory copy, so [`RecordStore::load`] must have
    /// run first or the persisted collection is overwritten.
    ///
    /// `edit` receives a copy of the current records; if it returns `Ok` the
    /// edited collection is written in full. Nothing is written on `Err`.
    pub async fn update<R, E>(
        &self,
        edit: impl FnOnce(&mut Vec<ProjectRecord>) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let _guard = self.writer.lock().await;
        let mut records = self.records.read().await.clone();
        let out = edit(&mut records)?;
        self.write_locked(records).await?;
        Ok(out)
    }

    async fn write_locked(&self, records: Vec<ProjectRecord>) -> Result<(), StoreError> {
        let bytes = encode(&records)?;
        self.backend.put(&self.keys.primary, &bytes).await?;
        self.backend.put(&self.keys.backup, &bytes).await?;
        debug!(count = records.len(), "project records written");
        *self.records.write().await = records;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{FileStore, MemoryStore};

    fn record(id: u32, name: &str) -> ProjectRecord {
        ProjectRecord::from_json(format!(r#"{{"id": {id}, "name": "{name}"}}"#).as_bytes())
            .unwrap()
    }

    fn store_over(backend: Arc<dyn KeyValueStore>) -> RecordStore {
        RecordStore::new(backend, RecordKeys::default())
    }

    #[tokio::test]
    async fn empty_backend_loads_empty() {
        let store = store_over(Arc::new(MemoryStore::new()));
        assert!(store.load().await.is_empty());
        assert!(store.all().await.is_empty());
    }

    #[tokio::test]
    async fn replace_all_writes_identical_primary_and_backup() {
        let backend = Arc::new(MemoryStore::new());
        let store = store_over(backend.clone());
        store
            .replace_all(vec![record(1, "Alpha"), record(2, "Beta")])
            .await
            .unwrap();

        let primary = backend.get("projects").await.unwrap().unwrap();
        let backup = backend.get("projects.backup").await.unwrap().unwrap();
        assert_eq!(primary, backup);
        assert_eq!(store.all().await.len(), 2);
        assert_eq!(store.get(ProjectId(2)).await.unwrap().name, "Beta");
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = Arc::new(FileStore::open(tmp.path()).await.unwrap());
        store_over(backend.clone())
            .replace_all(vec![record(5, "Five")])
            .await
            .unwrap();

        let reopened = store_over(Arc::new(FileStore::open(tmp.path()).await.unwrap()));
        let loaded = reopened.load().await;
        assert_eq!(loaded, vec![record(5, "Five")]);
    }

    #[tokio::test]
    async fn corrupt_primary_recovers_from_backup() {
        let backend = Arc::new(MemoryStore::new());
        let store = store_over(backend.clone());
        store.replace_all(vec![record(1, "Alpha")]).await.unwrap();
        backend.put("projects", b"{truncated").await.unwrap();

        let fresh = store_over(backend.clone());
        assert_eq!(fresh.load().await, vec![record(1, "Alpha")]);
        // Primary was rewritten from the backup.
        assert_eq!(
            backend.get("projects").await.unwrap(),
            backend.get("projects.backup").await.unwrap()
        );
    }

    #[tokio::test]
    async fn both_copies_corrupt_loads_empty() {
        let backend = Arc::new(MemoryStore::new());
        backend.put("projects", b"garbage").await.unwrap();
        backend.put("projects.backup", b"also garbage").await.unwrap();
        let store = store_over(backend);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn diverged_backup_is_rewritten_from_primary() {
        let backend = Arc::new(MemoryStore::new());
        let store = store_over(backend.clone());
        store.replace_all(vec![record(1, "Alpha")]).await.unwrap();
        backend
            .put("projects.backup", &encode(&[record(9, "Stale")]).unwrap())
            .await
            .unwrap();

        let loaded = store_over(backend.clone()).load().await;
        assert_eq!(loaded, vec![record(1, "Alpha")]);
        assert_eq!(
            backend.get("projects").await.unwrap(),
            backend.get("projects.backup").await.unwrap()
        );
    }

    #[tokio::test]
    async fn matching_backup_is_left_alone_on_load() {
        let backend = Arc::new(MemoryStore::new());
        store_over(backend.clone())
            .replace_all(vec![record(1, "Alpha")])
            .await
            .unwrap();
        let writes = backend.write_count();

        assert_eq!(store_over(backend.clone()).load().await, vec![record(1, "Alpha")]);
        assert_eq!(backend.write_count(), writes);
    }

    #[tokio::test]
    async fn update_writes_only_on_success() {
        let backend = Arc::new(MemoryStore::new());
        let store = store_over(backend.clone());
        store.replace_all(vec![record(1, "Alpha")]).await.unwrap();
        let writes = backend.write_count();

        let failed: Result<(), StoreError> = store
            .update(|records| {
                records.clear();
                Err(StoreError::InvalidKey("nope".into()))
            })
            .await;
        assert!(failed.is_err());
        assert_eq!(backend.write_count(), writes);
        assert_eq!(store.all().await.len(), 1);

        store
            .update(|records| {
                records.push(record(2, "Beta"));
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap();
        assert_eq!(store.all().await.len(), 2);
        assert_eq!(backend.write_count(), writes + 2);
    }

    #[tokio::test]
    async fn find_by_name_matches_custom_link() {
        let store = store_over(Arc::new(MemoryStore::new()));
        let mut r = record(3, "Gamma Ray");
        r.custom_link = Some("gamma".into());
        store.replace_all(vec![r]).await.unwrap();
        assert_eq!(store.find_by_name("gamma ray").await.unwrap().id, ProjectId(3));
        assert_eq!(store.find_by_name("/gamma").await.unwrap().id, ProjectId(3));
        assert!(store.find_by_name("delta").await.is_none());
    }
}

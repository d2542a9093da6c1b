use std::sync::Arc;

use tracing::{debug, warn};
use worldhub_kernel::World;

use crate::codec::{StoreError, decode, encode};
use crate::kv::KeyValueStore;

/// Persisted copy of the materialized world cache, stored under one key.
pub struct WorldCacheStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl WorldCacheStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Load the persisted worlds. Unreadable or invalid data loads as empty.
    pub async fn load(&self) -> Vec<World> {
        let bytes = match self.backend.get(&self.key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "world cache read failed; starting empty");
                return Vec::new();
            }
        };
        let worlds = match decode::<World>(&self.key, &bytes) {
            Ok(worlds) => worlds,
            Err(e) => {
                warn!(key = %self.key, error = %e, "world cache corrupt; starting empty");
                return Vec::new();
            }
        };
        let total = worlds.len();
        let valid: Vec<World> = worlds
            .into_iter()
            .filter(|w| match w.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(world = %w.id, error = %e, "dropping invalid cached world");
                    false
                }
            })
            .collect();
        debug!(loaded = valid.len(), dropped = total - valid.len(), "world cache loaded");
        valid
    }

    /// Replace the persisted worlds.
    pub async fn save(&self, worlds: &[World]) -> Result<(), StoreError> {
        let bytes = encode(worlds)?;
        self.backend.put(&self.key, &bytes).await
    }

    /// Remove the persisted worlds entirely.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.backend.delete(&self.key).await
    }
}

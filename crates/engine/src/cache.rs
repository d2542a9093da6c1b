//! In-memory world cache backed by a persisted copy, plus the staleness
//! policy that gates full reconciliation on re-entry.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use worldhub_common::WorldId;
use worldhub_kernel::{World, WorldError};
use worldhub_persist::{StoreError, WorldCacheStore};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Invalid(#[from] WorldError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Materialized worlds, keyed and ordered by world id (hub first).
///
/// Every mutation writes the full cache to the persisted copy before the
/// in-memory map is replaced, under a single write lock. Readers see either
/// the state before a mutation or after it.
pub struct WorldService {
    worlds: RwLock<BTreeMap<WorldId, World>>,
    store: WorldCacheStore,
}

impl WorldService {
    /// An empty cache. Call [`WorldService::reload_from_store`] to populate it.
    pub fn new(store: WorldCacheStore) -> Self {
        Self {
            worlds: RwLock::new(BTreeMap::new()),
            store,
        }
    }

    pub async fn get(&self, id: WorldId) -> Option<World> {
        self.worlds.read().await.get(&id).cloned()
    }

    pub async fn contains(&self, id: WorldId) -> bool {
        self.worlds.read().await.contains_key(&id)
    }

    pub async fn list(&self) -> Vec<World> {
        self.worlds.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.worlds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.worlds.read().await.is_empty()
    }

    /// Insert or replace `world`. Last write wins.
    pub async fn upsert(&self, world: World) -> Result<(), CacheError> {
        world.validate()?;
        let mut worlds = self.worlds.write().await;
        let mut next = worlds.clone();
        next.insert(world.id, world);
        self.persist(&next).await?;
        *worlds = next;
        Ok(())
    }

    pub async fn remove(&self, id: WorldId) -> Result<Option<World>, CacheError> {
        let mut worlds = self.worlds.write().await;
        if !worlds.contains_key(&id) {
            return Ok(None);
        }
        let mut next = worlds.clone();
        let removed = next.remove(&id);
        self.persist(&next).await?;
        *worlds = next;
        Ok(removed)
    }

    /// Drop every cached world, in memory and persisted.
    pub async fn clear(&self) -> Result<(), CacheError> {
        let mut worlds = self.worlds.write().await;
        self.store.clear().await?;
        worlds.clear();
        debug!("world cache cleared");
        Ok(())
    }

    /// Discard in-memory state and repopulate strictly from the persisted copy.
    pub async fn reload_from_store(&self) -> usize {
        let mut worlds = self.worlds.write().await;
        let loaded = self.store.load().await;
        *worlds = loaded.into_iter().map(|w| (w.id, w)).collect();
        debug!(count = worlds.len(), "world cache reloaded from store");
        worlds.len()
    }

    /// Swap the whole cache for `replacement` in one step.
    pub async fn replace_all(&self, replacement: Vec<World>) -> Result<(), CacheError> {
        for world in &replacement {
            world.validate()?;
        }
        let next: BTreeMap<WorldId, World> =
            replacement.into_iter().map(|w| (w.id, w)).collect();
        let mut worlds = self.worlds.write().await;
        self.persist(&next).await?;
        *worlds = next;
        debug!(count = worlds.len(), "world cache replaced");
        Ok(())
    }

    async fn persist(&self, worlds: &BTreeMap<WorldId, World>) -> Result<(), StoreError> {
        let snapshot: Vec<World> = worlds.values().cloned().collect();
        self.store.save(&snapshot).await
    }
}

/// Session-scoped record of the last full reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct StalenessPolicy {
    threshold: Duration,
    last_reconciled: Option<Instant>,
}

impl StalenessPolicy {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_reconciled: None,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn last_reconciled(&self) -> Option<Instant> {
        self.last_reconciled
    }

    /// True if nothing was reconciled this session, or the last
    /// reconciliation is at least `threshold` old.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_reconciled
            .is_none_or(|last| now.saturating_duration_since(last) >= self.threshold)
    }

    pub fn mark_reconciled(&mut self, now: Instant) {
        self.last_reconciled = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::sync::Arc;
    use worldhub_common::{Placement, ProjectId};
    use worldhub_kernel::{WorldObject, WorldObjectKind};
    use worldhub_persist::{KeyValueStore, MemoryStore};

    fn service(backend: Arc<MemoryStore>) -> WorldService {
        WorldService::new(WorldCacheStore::new(backend, "worlds"))
    }

    fn world(id: WorldId, objects: usize) -> World {
        let mut world = World::new(id, format!("world {id}"));
        for i in 0..objects {
            world.objects.push(
                WorldObject::new(format!("obj-{i}"), WorldObjectKind::Image, "img")
                    .with_placement(Placement::at(Vec3::new(i as f32, 0.0, 0.0))),
            );
        }
        world
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let cache = service(Arc::new(MemoryStore::new()));
        let w = world(WorldId::Project(ProjectId(3)), 2);
        cache.upsert(w.clone()).await.unwrap();
        assert_eq!(cache.get(w.id).await, Some(w));
    }

    #[tokio::test]
    async fn round_trip_survives_reload_from_store() {
        let backend = Arc::new(MemoryStore::new());
        let cache = service(backend.clone());
        let w = world(WorldId::Project(ProjectId(3)), 4);
        cache.upsert(w.clone()).await.unwrap();
        cache.upsert(world(WorldId::Hub, 0)).await.unwrap();

        assert_eq!(cache.reload_from_store().await, 2);
        assert_eq!(cache.get(w.id).await, Some(w.clone()));

        let fresh = service(backend);
        fresh.reload_from_store().await;
        assert_eq!(fresh.get(w.id).await, Some(w));
    }

    #[tokio::test]
    async fn list_is_ordered_hub_first() {
        let cache = service(Arc::new(MemoryStore::new()));
        cache.upsert(world(WorldId::Project(ProjectId(9)), 0)).await.unwrap();
        cache.upsert(world(WorldId::Project(ProjectId(2)), 0)).await.unwrap();
        cache.upsert(world(WorldId::Hub, 0)).await.unwrap();
        let ids: Vec<_> = cache.list().await.into_iter().map(|w| w.id).collect();
        assert_eq!(
            ids,
            vec![
                WorldId::Hub,
                WorldId::Project(ProjectId(2)),
                WorldId::Project(ProjectId(9))
            ]
        );
    }

    #[tokio::test]
    async fn invalid_world_is_rejected_and_not_stored() {
        let backend = Arc::new(MemoryStore::new());
        let cache = service(backend.clone());
        let mut bad = world(WorldId::Hub, 1);
        bad.objects[0].placement.position.x = f32::NAN;
        assert!(matches!(
            cache.upsert(bad).await,
            Err(CacheError::Invalid(_))
        ));
        assert!(cache.is_empty().await);
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn remove_and_clear_reach_the_store() {
        let backend = Arc::new(MemoryStore::new());
        let cache = service(backend.clone());
        cache.upsert(world(WorldId::Hub, 0)).await.unwrap();
        cache.upsert(world(WorldId::Project(ProjectId(1)), 0)).await.unwrap();

        let removed = cache.remove(WorldId::Project(ProjectId(1))).await.unwrap();
        assert!(removed.is_some());
        assert_eq!(cache.remove(WorldId::Project(ProjectId(1))).await.unwrap(), None);
        assert_eq!(cache.reload_from_store().await, 1);

        cache.clear().await.unwrap();
        assert!(cache.is_empty().await);
        assert_eq!(backend.get("worlds").await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_all_is_all_or_nothing() {
        let cache = service(Arc::new(MemoryStore::new()));
        cache.upsert(world(WorldId::Hub, 1)).await.unwrap();
        let mut bad = world(WorldId::Project(ProjectId(1)), 1);
        bad.objects[0].placement.scale = Vec3::INFINITY;

        let result = cache
            .replace_all(vec![world(WorldId::Hub, 0), bad])
            .await;
        assert!(result.is_err());
        assert_eq!(cache.get(WorldId::Hub).await.unwrap().objects.len(), 1);

        cache
            .replace_all(vec![world(WorldId::Project(ProjectId(5)), 0)])
            .await
            .unwrap();
        assert_eq!(cache.len().await, 1);
        assert!(!cache.contains(WorldId::Hub).await);
    }

    #[tokio::test(start_paused = true)]
    async fn staleness_is_due_once_per_threshold() {
        let mut policy = StalenessPolicy::new(Duration::from_secs(30));
        let start = Instant::now();
        assert!(policy.is_due(start));

        policy.mark_reconciled(start);
        assert!(!policy.is_due(start));
        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!policy.is_due(Instant::now()));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(policy.is_due(Instant::now()));
        assert_eq!(policy.last_reconciled(), Some(start));
    }
}

use std::sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use glam::Vec3;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use worldhub_author::{EditError, ReconcileError, Reconciler, RecordEditor, SaveOutcome};
use worldhub_common::{ProjectId, WorldId};
use worldhub_kernel::{ProjectRecord, World};
use worldhub_materialize::{build_hub_world, build_subworld};
use worldhub_persist::{KeyValueStore, RecordStore, WorldCacheStore};
use worldhub_stream::{DefinitionLoader, DefinitionSource};

use crate::cache::{CacheError, StalenessPolicy, WorldService};
use crate::config::EngineConfig;
use crate::navigator::{self, NavState, Navigator, ResolveError, WorldResolver};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("initialization failed: {0}")]
    Initialize(Arc<EngineError>),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

type InitRun = Shared<BoxFuture<'static, Result<(), Arc<EngineError>>>>;

enum InitState {
    Uninitialized,
    /// A run is in flight; callers join it.
    Initializing(InitRun),
    Ready,
}

struct Lifecycle {
    init: InitState,
    staleness: StalenessPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
    /// Keep the hub layout and every cached subworld that still matches its record.
    Incremental,
    /// Start from an empty cache.
    Forced,
}

struct Inner {
    config: EngineConfig,
    loader: DefinitionLoader,
    records: RecordStore,
    worlds: WorldService,
    reconciler: Reconciler,
    navigator: Mutex<Navigator>,
    lifecycle: SyncMutex<Lifecycle>,
    /// Set once the persisted records and world cache are in memory.
    loaded: OnceCell<()>,
    /// Serializes load + reconcile + cache swap sequences and admin edits.
    refresh: Mutex<()>,
}

/// Resolves projects and worlds for one session.
///
/// Cheap to clone; clones share all state. Construct one per host with the
/// definition source and storage backend it should use.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn DefinitionSource>,
        backend: Arc<dyn KeyValueStore>,
    ) -> Self {
        let loader = DefinitionLoader::new(source, config.catalog.clone(), config.loader_config());
        let records = RecordStore::new(backend.clone(), config.keys.record_keys());
        let worlds = WorldService::new(WorldCacheStore::new(backend, config.keys.worlds.clone()));
        let lifecycle = Lifecycle {
            init: InitState::Uninitialized,
            staleness: StalenessPolicy::new(config.staleness()),
        };
        Self {
            inner: Arc::new(Inner {
                reconciler: Reconciler::new(config.conflict_policy),
                config,
                loader,
                records,
                worlds,
                navigator: Mutex::new(Navigator::new()),
                lifecycle: SyncMutex::new(lifecycle),
                loaded: OnceCell::new(),
                refresh: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Definition documents fetched over this engine's lifetime.
    pub fn fetch_count(&self) -> usize {
        self.inner.loader.fetch_count()
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Bring the persisted records and world cache into memory, once.
    ///
    /// Every read and write goes through this first, so nothing written
    /// before [`Engine::initialize`] can replace persisted state with an
    /// empty in-memory copy.
    async fn ensure_loaded(&self) {
        self.inner
            .loaded
            .get_or_init(|| async {
                self.inner.records.load().await;
                self.inner.worlds.reload_from_store().await;
            })
            .await;
    }

    /// Load, reconcile and materialize.
    ///
    /// Concurrent callers share one run. Once ready, later calls do nothing
    /// until the staleness threshold has passed since the last reconciliation.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        let run = {
            let mut guard = self.lifecycle();
            let lifecycle = &mut *guard;
            let joined = match &lifecycle.init {
                InitState::Initializing(run) => Some(run.clone()),
                InitState::Ready if !lifecycle.staleness.is_due(Instant::now()) => {
                    debug!("engine ready and fresh; nothing to do");
                    return Ok(());
                }
                InitState::Ready | InitState::Uninitialized => None,
            };
            match joined {
                Some(run) => run,
                None => {
                    let engine = self.clone();
                    let run = async move {
                        let result = engine.run_initialize().await.map_err(Arc::new);
                        engine.lifecycle().init = if result.is_ok() {
                            InitState::Ready
                        } else {
                            InitState::Uninitialized
                        };
                        result
                    }
                    .boxed()
                    .shared();
                    lifecycle.init = InitState::Initializing(run.clone());
                    run
                }
            }
        };
        run.await.map_err(EngineError::Initialize)
    }

    async fn run_initialize(&self) -> Result<(), EngineError> {
        let span = info_span!("initialize");
        async {
            self.ensure_loaded().await;
            self.refresh(RefreshMode::Incremental).await?;

            let target = {
                let mut nav = self.inner.navigator.lock().await;
                nav.take_deep_link()
                    .unwrap_or_else(|| nav.current_world_id())
            };
            let entered = self.transition(target).await;
            let projects = self.inner.records.all().await.len();
            let worlds = self.inner.worlds.len().await;
            info!(projects, worlds, world = %entered, "engine initialized");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Reload every definition and rebuild the world cache from scratch.
    ///
    /// The new cache is swapped in whole; readers never see a half-cleared cache.
    pub async fn force_reload(&self) -> Result<(), EngineError> {
        self.initialize().await?;
        let span = info_span!("force_reload");
        async {
            self.refresh(RefreshMode::Forced).await?;
            let current = self.current_world_id().await;
            let entered = self.transition(current).await;
            info!(world = %entered, "forced reload complete");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn refresh(&self, mode: RefreshMode) -> Result<(), EngineError> {
        let _guard = self.inner.refresh.lock().await;

        let report = self.inner.loader.load_all().await;
        if report.definitions.is_empty() && !report.skipped.is_empty() {
            warn!(
                skipped = report.skipped.len(),
                "no definition could be loaded; keeping stored records"
            );
        } else {
            self.inner
                .reconciler
                .commit(&self.inner.records, report.definitions)
                .await?;
        }
        self.lifecycle().staleness.mark_reconciled(Instant::now());

        let worlds = self.plan_worlds(mode).await;
        self.inner.worlds.replace_all(worlds).await?;
        Ok(())
    }

    /// The cache contents after a refresh: a rebuilt hub plus, incrementally,
    /// every cached subworld whose content count still matches its record.
    async fn plan_worlds(&self, mode: RefreshMode) -> Vec<World> {
        let projects = self.inner.records.all().await;
        let previous = match mode {
            RefreshMode::Incremental => self.inner.worlds.list().await,
            RefreshMode::Forced => Vec::new(),
        };
        let previous_hub = previous.iter().find(|w| w.id.is_hub());
        let mut worlds = vec![build_hub_world(&projects, previous_hub, &self.inner.config.hub)];

        for world in &previous {
            let Some(id) = world.id.project_id() else {
                continue;
            };
            match projects.iter().find(|p| p.id == id) {
                Some(project) if world.content_object_count() == project.expected_content_count() => {
                    worlds.push(world.clone());
                }
                Some(_) => debug!(world = %world.id, "cached subworld is stale; dropping"),
                None => debug!(world = %world.id, "project no longer exists; dropping subworld"),
            }
        }
        worlds
    }

    async fn transition(&self, target: WorldId) -> WorldId {
        self.ensure_loaded().await;
        let mut nav = self.inner.navigator.lock().await;
        let entered = nav.transition(target, self).await;
        if nav.state() == NavState::Loading(WorldId::Hub) {
            if let Err(error) = self.ensure_world(WorldId::Hub).await {
                warn!(%error, "hub could not be materialized");
            }
            nav.settle(self.inner.worlds.contains(WorldId::Hub).await);
        }
        entered
    }

    async fn rebuild_hub(&self) -> Result<(), EngineError> {
        let projects = self.inner.records.all().await;
        let previous = self.inner.worlds.get(WorldId::Hub).await;
        let hub = build_hub_world(&projects, previous.as_ref(), &self.inner.config.hub);
        self.inner.worlds.upsert(hub).await?;
        Ok(())
    }

    pub async fn get_all_projects(&self) -> Vec<ProjectRecord> {
        self.ensure_loaded().await;
        self.inner.records.all().await
    }

    pub async fn get_project_by_id(&self, id: ProjectId) -> Option<ProjectRecord> {
        self.ensure_loaded().await;
        self.inner.records.get(id).await
    }

    /// Look a project up by name (case-insensitive) or custom link.
    pub async fn get_project_by_name(&self, name_or_link: &str) -> Option<ProjectRecord> {
        self.ensure_loaded().await;
        self.inner.records.find_by_name(name_or_link).await
    }

    /// The world `id`, materialized if it is not cached. `None` for an unknown project.
    pub async fn get_world(&self, id: WorldId) -> Result<Option<World>, EngineError> {
        match self.ensure_world(id).await {
            Ok(world) => Ok(Some(world)),
            Err(ResolveError::UnknownProject(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every cached world, hub first.
    pub async fn get_all_worlds(&self) -> Vec<World> {
        self.ensure_loaded().await;
        self.inner.worlds.list().await
    }

    pub async fn update_world(&self, world: World) -> Result<(), EngineError> {
        self.ensure_loaded().await;
        self.inner.worlds.upsert(world).await?;
        Ok(())
    }

    pub async fn remove_world(&self, id: WorldId) -> Result<Option<World>, EngineError> {
        self.ensure_loaded().await;
        Ok(self.inner.worlds.remove(id).await?)
    }

    pub async fn clear_all_worlds(&self) -> Result<(), EngineError> {
        self.ensure_loaded().await;
        self.inner.worlds.clear().await?;
        Ok(())
    }

    /// Replace the in-memory cache with the persisted copy. Returns the world count.
    pub async fn reload_worlds(&self) -> usize {
        self.ensure_loaded().await;
        self.inner.worlds.reload_from_store().await
    }

    /// Navigate to `id`, returning the world actually entered.
    pub async fn set_current_world_id(&self, id: WorldId) -> WorldId {
        self.transition(id).await
    }

    /// Navigate to a raw world id. Unrecognized ids land on the hub.
    pub async fn navigate(&self, raw: &str) -> WorldId {
        let target = raw.parse::<WorldId>().unwrap_or_else(|error| {
            warn!(%error, "unrecognized world id; returning to hub");
            WorldId::Hub
        });
        self.transition(target).await
    }

    pub async fn current_world_id(&self) -> WorldId {
        self.inner.navigator.lock().await.current_world_id()
    }

    pub async fn nav_state(&self) -> NavState {
        self.inner.navigator.lock().await.state()
    }

    /// World to enter at the next initialization instead of the hub.
    pub async fn set_deep_link(&self, id: WorldId) {
        self.inner.navigator.lock().await.set_deep_link(id);
    }

    /// Focal point of the current world, or the origin.
    pub async fn get_camera_target(&self) -> Vec3 {
        self.ensure_loaded().await;
        let current = self.current_world_id().await;
        navigator::camera_target(self.inner.worlds.get(current).await.as_ref())
    }

    /// Save a record, then rebuild its subworld and the hub.
    pub async fn save_project(&self, record: ProjectRecord) -> Result<SaveOutcome, EngineError> {
        self.ensure_loaded().await;
        let _guard = self.inner.refresh.lock().await;
        let id = record.id;
        let outcome = RecordEditor::new(&self.inner.records).save(record).await?;
        if let Some(saved) = self.inner.records.get(id).await {
            let world = build_subworld(&saved, self.inner.config.variant);
            self.inner.worlds.upsert(world).await?;
        }
        self.rebuild_hub().await?;
        Ok(outcome)
    }

    /// Delete a record, its subworld and its hub card.
    pub async fn delete_project(&self, id: ProjectId) -> Result<ProjectRecord, EngineError> {
        self.ensure_loaded().await;
        let world = WorldId::Project(id);
        let removed = {
            let _guard = self.inner.refresh.lock().await;
            let removed = RecordEditor::new(&self.inner.records).delete(id).await?;
            self.inner.worlds.remove(world).await?;
            self.rebuild_hub().await?;
            removed
        };
        if self.current_world_id().await == world {
            self.transition(WorldId::Hub).await;
        }
        Ok(removed)
    }
}

#[async_trait]
impl WorldResolver for Engine {
    async fn is_loaded(&self, id: WorldId) -> bool {
        self.ensure_loaded().await;
        self.inner.worlds.contains(id).await
    }

    async fn ensure_world(&self, id: WorldId) -> Result<World, ResolveError> {
        self.ensure_loaded().await;
        if let Some(world) = self.inner.worlds.get(id).await {
            return Ok(world);
        }
        let world = match id.project_id() {
            None => {
                let projects = self.inner.records.all().await;
                build_hub_world(&projects, None, &self.inner.config.hub)
            }
            Some(project) => {
                let record = self
                    .inner
                    .records
                    .get(project)
                    .await
                    .ok_or(ResolveError::UnknownProject(project))?;
                build_subworld(&record, self.inner.config.variant)
            }
        };
        debug!(world = %id, objects = world.objects.len(), "materialized world");
        self.inner.worlds.upsert(world.clone()).await?;
        Ok(world)
    }
}

use async_trait::async_trait;
use glam::Vec3;
use tracing::{debug, warn};
use worldhub_common::{ProjectId, WorldId};
use worldhub_kernel::World;

use crate::cache::CacheError;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no project with id {0}")]
    UnknownProject(ProjectId),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Supplies worlds to the [`Navigator`], materializing them on a cache miss.
#[async_trait]
pub trait WorldResolver: Send + Sync {
    async fn is_loaded(&self, id: WorldId) -> bool;

    async fn ensure_world(&self, id: WorldId) -> Result<World, ResolveError>;
}

/// Where the viewer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// Waiting for the world to be materialized.
    Loading(WorldId),
    Ready(WorldId),
}

impl NavState {
    pub fn world_id(&self) -> WorldId {
        match self {
            Self::Loading(id) | Self::Ready(id) => *id,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Tracks the current world and resolves transitions between worlds.
///
/// A transition never fails: a target that cannot be resolved lands on the
/// hub instead.
#[derive(Debug)]
pub struct Navigator {
    state: NavState,
    deep_link: Option<WorldId>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            state: NavState::Loading(WorldId::Hub),
            deep_link: None,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn current_world_id(&self) -> WorldId {
        self.state.world_id()
    }

    /// Request `id` as the first world shown. Replaces an unconsumed link.
    pub fn set_deep_link(&mut self, id: WorldId) {
        self.deep_link = Some(id);
    }

    /// The pending deep link, which is cleared by this call.
    pub fn take_deep_link(&mut self) -> Option<WorldId> {
        self.deep_link.take()
    }

    /// Move to `target` and return the world actually entered.
    pub async fn transition(&mut self, target: WorldId, resolver: &dyn WorldResolver) -> WorldId {
        if self.state == NavState::Ready(target) && resolver.is_loaded(target).await {
            return target;
        }
        if target.is_hub() {
            return self.enter_hub(resolver).await;
        }
        match resolver.ensure_world(target).await {
            Ok(_) => {
                debug!(world = %target, "entered world");
                self.state = NavState::Ready(target);
                target
            }
            Err(error) => {
                warn!(world = %target, %error, "world unavailable; returning to hub");
                self.enter_hub(resolver).await
            }
        }
    }

    async fn enter_hub(&mut self, resolver: &dyn WorldResolver) -> WorldId {
        self.state = if resolver.is_loaded(WorldId::Hub).await {
            NavState::Ready(WorldId::Hub)
        } else {
            NavState::Loading(WorldId::Hub)
        };
        WorldId::Hub
    }

    /// Promote a pending hub transition once the hub has been materialized.
    pub fn settle(&mut self, hub_loaded: bool) {
        if hub_loaded && self.state == NavState::Loading(WorldId::Hub) {
            self.state = NavState::Ready(WorldId::Hub);
        }
    }
}

/// Camera focal point for `world`, or the origin when there is no world.
pub fn camera_target(world: Option<&World>) -> Vec3 {
    world.map_or(Vec3::ZERO, World::camera_target)
}

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Reserved id of the hub world.
pub const HUB_WORLD_ID: &str = "mainWorld";

/// Prefix of every project subworld id.
pub const PROJECT_WORLD_PREFIX: &str = "project-world-";

/// Unique identifier of a project, as authored in its definition document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProjectId(pub u32);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from parsing a world id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldIdError {
    #[error("unrecognized world id: {0:?}")]
    Unrecognized(String),
    #[error("invalid project id in world id {0:?}")]
    InvalidProjectId(String),
}

/// Identifier of a world: the hub, or one subworld per project.
///
/// Serialized as `mainWorld` or `project-world-<id>`. Any other string is
/// rejected, so a `WorldId` value always follows the reserved naming scheme.
/// Ordering puts the hub first, then subworlds by project id.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum WorldId {
    #[default]
    Hub,
    Project(ProjectId),
}

impl WorldId {
    /// Subworld id for a project.
    pub fn project(id: ProjectId) -> Self {
        Self::Project(id)
    }

    pub fn is_hub(&self) -> bool {
        matches!(self, Self::Hub)
    }

    /// The project this world belongs to, if it is a subworld.
    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            Self::Hub => None,
            Self::Project(id) => Some(*id),
        }
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hub => f.write_str(HUB_WORLD_ID),
            Self::Project(id) => write!(f, "{PROJECT_WORLD_PREFIX}{id}"),
        }
    }
}

impl FromStr for WorldId {
    type Err = WorldIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == HUB_WORLD_ID {
            return Ok(Self::Hub);
        }
        let Some(rest) = s.strip_prefix(PROJECT_WORLD_PREFIX) else {
            return Err(WorldIdError::Unrecognized(s.to_string()));
        };
        // `u32::from_str` accepts a leading '+', which would give two spellings
        // of the same id.
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WorldIdError::InvalidProjectId(s.to_string()));
        }
        rest.parse::<u32>()
            .map(|id| Self::Project(ProjectId(id)))
            .map_err(|_| WorldIdError::InvalidProjectId(s.to_string()))
    }
}

impl TryFrom<String> for WorldId {
    type Error = WorldIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WorldId> for String {
    fn from(id: WorldId) -> Self {
        id.to_string()
    }
}

/// Position, Euler rotation (radians) and scale of a world object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Placement {
    /// Placement at `position` with no rotation and unit scale.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Whether every component of every vector is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

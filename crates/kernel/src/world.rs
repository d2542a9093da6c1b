use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use worldhub_common::{Placement, ProjectId, WorldId};

use crate::project::{MediaKind, WorldSettings};

/// Closed set of world object kinds, with their kind-specific fields.
///
/// Serialized as the object's `type` discriminant; an unknown discriminant is
/// a parse error rather than an opaque object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorldObjectKind {
    /// Navigation control that moves the viewer to another world.
    Button { destination: WorldId },
    /// Card standing for a project; in the hub it leads to the project's subworld.
    ProjectCard {
        #[serde(rename = "projectId")]
        project_id: ProjectId,
    },
    Image,
    Video,
    Pdf,
    Link,
}

impl WorldObjectKind {
    /// Whether this kind is project content rather than navigation or summary.
    pub fn is_content(&self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Pdf | Self::Link)
    }
}

impl From<MediaKind> for WorldObjectKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Self::Image,
            MediaKind::Video => Self::Video,
            MediaKind::Pdf => Self::Pdf,
            MediaKind::Link => Self::Link,
        }
    }
}

/// A renderable object inside a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: String,
    #[serde(flatten)]
    pub kind: WorldObjectKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(flatten)]
    pub placement: Placement,
}

impl WorldObject {
    pub fn new(id: impl Into<String>, kind: WorldObjectKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            description: None,
            url: None,
            thumbnail: None,
            placement: Placement::default(),
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// The project this object is a card for, if any.
    pub fn card_project(&self) -> Option<ProjectId> {
        match self.kind {
            WorldObjectKind::ProjectCard { project_id } => Some(project_id),
            _ => None,
        }
    }
}

/// Validation failures for a world.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("world {world}: object {object:?} has a non-finite placement")]
    NonFinitePlacement { world: WorldId, object: String },
    #[error("world {0}: camera target is not finite")]
    NonFiniteCameraTarget(WorldId),
    #[error("world {world}: duplicate object id {object:?}")]
    DuplicateObjectId { world: WorldId, object: String },
}

/// A materialized world: the hub, or one project's subworld.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub id: WorldId,
    pub name: String,
    pub settings: WorldSettings,
    pub objects: Vec<WorldObject>,
}

impl World {
    /// An empty world with default environment settings.
    pub fn new(id: WorldId, name: impl Into<String>) -> Self {
        Self::with_settings(id, name, WorldSettings::default())
    }

    pub fn with_settings(id: WorldId, name: impl Into<String>, settings: WorldSettings) -> Self {
        Self {
            id,
            name: name.into(),
            settings,
            objects: Vec::new(),
        }
    }

    /// Look up an object by id.
    pub fn object(&self, id: &str) -> Option<&WorldObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// All project cards, in world order.
    pub fn project_cards(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.iter().filter(|o| o.card_project().is_some())
    }

    /// The card for `project`, if this world has one.
    pub fn project_card(&self, project: ProjectId) -> Option<&WorldObject> {
        self.objects
            .iter()
            .find(|o| o.card_project() == Some(project))
    }

    /// Number of content objects, excluding navigation and summary objects.
    pub fn content_object_count(&self) -> usize {
        self.objects.iter().filter(|o| o.kind.is_content()).count()
    }

    /// Configured focal point, or the origin when none is set.
    pub fn camera_target(&self) -> Vec3 {
        self.settings.camera_target.unwrap_or(Vec3::ZERO)
    }

    /// Check placement finiteness and object id uniqueness.
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.settings.camera_target.is_some_and(|t| !t.is_finite()) {
            return Err(WorldError::NonFiniteCameraTarget(self.id));
        }
        let mut seen = HashSet::new();
        for object in &self.objects {
            if !object.placement.is_finite() {
                return Err(WorldError::NonFinitePlacement {
                    world: self.id,
                    object: object.id.clone(),
                });
            }
            if !seen.insert(object.id.as_str()) {
                return Err(WorldError::DuplicateObjectId {
                    world: self.id,
                    object: object.id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_world() -> World {
        let mut world = World::new(WorldId::Project(ProjectId(4)), "Sample");
        world.objects.push(WorldObject::new(
            "summary",
            WorldObjectKind::ProjectCard {
                project_id: ProjectId(4),
            },
            "Sample",
        ));
        world.objects.push(WorldObject::new(
            "back",
            WorldObjectKind::Button {
                destination: WorldId::Hub,
            },
            "Back",
        ));
        world.objects.push(
            WorldObject::new("img", WorldObjectKind::Image, "Still")
                .with_placement(Placement::at(Vec3::new(1.5, 2.0, -3.0))),
        );
        world
    }

    #[test]
    fn object_serializes_with_type_discriminant() {
        let card = WorldObject::new(
            "card-1",
            WorldObjectKind::ProjectCard {
                project_id: ProjectId(1),
            },
            "Alpha",
        );
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["type"], "project-card");
        assert_eq!(json["projectId"], 1);
        assert_eq!(json["position"], serde_json::json!([0.0, 0.0, 0.0]));
        assert_eq!(json["scale"], serde_json::json!([1.0, 1.0, 1.0]));
    }

    #[test]
    fn button_destination_uses_world_id_string() {
        let back = WorldObject::new(
            "back",
            WorldObjectKind::Button {
                destination: WorldId::Hub,
            },
            "Back",
        );
        let json = serde_json::to_value(&back).unwrap();
        assert_eq!(json["destination"], "mainWorld");
    }

    #[test]
    fn unknown_object_type_is_rejected() {
        let json = r#"{"id": "x", "type": "portal", "title": "?",
            "position": [0,0,0], "rotation": [0,0,0], "scale": [1,1,1]}"#;
        assert!(serde_json::from_str::<WorldObject>(json).is_err());
    }

    #[test]
    fn world_json_round_trip() {
        let world = sample_world();
        let json = serde_json::to_string(&world).unwrap();
        let back: World = serde_json::from_str(&json).unwrap();
        assert_eq!(back, world);
    }

    #[test]
    fn content_count_excludes_fixed_objects() {
        let world = sample_world();
        assert_eq!(world.objects.len(), 3);
        assert_eq!(world.content_object_count(), 1);
        assert_eq!(world.project_cards().count(), 1);
        assert!(world.project_card(ProjectId(4)).is_some());
        assert!(world.project_card(ProjectId(5)).is_none());
    }

    #[test]
    fn camera_target_defaults_to_origin() {
        let mut world = sample_world();
        assert_eq!(world.camera_target(), Vec3::ZERO);
        world.settings.camera_target = Some(Vec3::new(0.0, 1.6, 4.0));
        assert_eq!(world.camera_target(), Vec3::new(0.0, 1.6, 4.0));
    }

    #[test]
    fn validate_rejects_non_finite_and_duplicates() {
        let mut world = sample_world();
        world.validate().unwrap();

        world.objects[2].placement.rotation.y = f32::INFINITY;
        assert!(matches!(
            world.validate(),
            Err(WorldError::NonFinitePlacement { .. })
        ));

        let mut world = sample_world();
        let dup = world.objects[2].clone();
        world.objects.push(dup);
        assert!(matches!(
            world.validate(),
            Err(WorldError::DuplicateObjectId { .. })
        ));

        let mut world = sample_world();
        world.settings.camera_target = Some(Vec3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(
            world.validate(),
            Err(WorldError::NonFiniteCameraTarget(world.id))
        );
    }
}

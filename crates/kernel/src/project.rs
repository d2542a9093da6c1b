use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use worldhub_common::ProjectId;

/// Publication status of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Completed,
    InProgress,
}

/// Presentation type of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectKind {
    #[default]
    Standard,
    Video,
}

/// Content kinds allowed for media objects and gallery assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    Image,
    Video,
    Pdf,
    Link,
}

/// A light source: hex colour plus intensity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub color: String,
    pub intensity: f32,
}

/// Environment of a world: colours, optional textures, lights and focal point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldSettings {
    pub background_color: String,
    pub floor_color: String,
    pub sky_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_texture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sky_texture: Option<String>,
    pub ambient_light: Light,
    pub directional_light: Light,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_target: Option<Vec3>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            background_color: "#101018".into(),
            floor_color: "#202030".into(),
            sky_color: "#87ceeb".into(),
            floor_texture: None,
            sky_texture: None,
            ambient_light: Light {
                color: "#ffffff".into(),
                intensity: 0.6,
            },
            directional_light: Light {
                color: "#ffffff".into(),
                intensity: 1.0,
            },
            camera_target: None,
        }
    }
}

impl WorldSettings {
    fn is_finite(&self) -> bool {
        self.ambient_light.intensity.is_finite()
            && self.directional_light.intensity.is_finite()
            && self.camera_target.is_none_or(|t| t.is_finite())
    }
}

/// An authored content object of a project, optionally with a fixed placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec3>,
}

impl MediaObject {
    fn is_finite(&self) -> bool {
        [self.position, self.rotation, self.scale]
            .iter()
            .flatten()
            .all(|v| v.is_finite())
    }
}

/// An unpositioned gallery asset; placed by procedural layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetGalleryEntry {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default)]
    pub category: String,
    pub url: String,
}

/// Externally authored description of one project.
///
/// Unknown JSON fields are ignored so that newer documents still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDefinition {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(rename = "type", default)]
    pub kind: ProjectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_link: Option<String>,
    #[serde(default)]
    pub world_settings: WorldSettings,
    #[serde(default)]
    pub media_objects: Vec<MediaObject>,
    #[serde(default)]
    pub asset_gallery: Vec<AssetGalleryEntry>,
}

/// The persisted, admin-editable form of a project. Same shape as a definition.
pub type ProjectRecord = ProjectDefinition;

/// Validation failures for a project.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectError {
    #[error("project {0} has an empty name")]
    EmptyName(ProjectId),
    #[error("project {project} has a non-finite value in {field}")]
    NonFinite { project: ProjectId, field: String },
    #[error("project {project} reuses media object id {media_id:?}")]
    DuplicateMediaId { project: ProjectId, media_id: String },
}

impl ProjectDefinition {
    /// Parse a definition document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Number of content objects a fresh subworld for this project holds.
    pub fn expected_content_count(&self) -> usize {
        self.media_objects.len() + self.asset_gallery.len()
    }

    /// Whether `query` names this project, by name (case-insensitive) or by
    /// custom link (leading and trailing slashes ignored).
    pub fn matches_name_or_link(&self, query: &str) -> bool {
        let query = query.trim();
        if self.name.eq_ignore_ascii_case(query) {
            return true;
        }
        let trimmed = query.trim_matches('/');
        self.custom_link
            .as_deref()
            .is_some_and(|link| !trimmed.is_empty() && link.trim_matches('/') == trimmed)
    }

    /// Check the invariants every stored project must satisfy.
    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.name.trim().is_empty() {
            return Err(ProjectError::EmptyName(self.id));
        }
        if !self.world_settings.is_finite() {
            return Err(ProjectError::NonFinite {
                project: self.id,
                field: "worldSettings".into(),
            });
        }
        let mut seen = HashSet::new();
        for media in &self.media_objects {
            if !media.is_finite() {
                return Err(ProjectError::NonFinite {
                    project: self.id,
                    field: format!("mediaObjects[{}]", media.id),
                });
            }
            if !seen.insert(media.id.as_str()) {
                return Err(ProjectError::DuplicateMediaId {
                    project: self.id,
                    media_id: media.id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{"id": 3, "name": "Orbit"}"#;

    #[test]
    fn minimal_document_fills_defaults() {
        let def = ProjectDefinition::from_json(MINIMAL.as_bytes()).unwrap();
        assert_eq!(def.id, ProjectId(3));
        assert_eq!(def.status, ProjectStatus::Completed);
        assert_eq!(def.kind, ProjectKind::Standard);
        assert!(def.media_objects.is_empty());
        assert!(def.asset_gallery.is_empty());
        assert_eq!(def.world_settings, WorldSettings::default());
        assert_eq!(def.expected_content_count(), 0);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r##"{
            "id": 1, "name": "Alpha", "futureField": {"nested": true},
            "worldSettings": {"skyColor": "#000000", "fog": 0.3}
        }"##;
        let def = ProjectDefinition::from_json(json.as_bytes()).unwrap();
        assert_eq!(def.world_settings.sky_color, "#000000");
        assert_eq!(def.world_settings.floor_color, "#202030");
    }

    #[test]
    fn full_document_parses() {
        let json = r#"{
            "id": 12,
            "name": "Tide",
            "description": "A film",
            "link": "https://example.com/tide",
            "thumbnail": "tide.png",
            "status": "in-progress",
            "type": "video",
            "videoUrl": "https://example.com/tide.mp4",
            "customLink": "/tide",
            "mediaObjects": [
                {"id": "poster", "type": "image", "title": "Poster", "position": [1, 2, 3]},
                {"id": "notes", "type": "pdf", "title": "Notes"}
            ],
            "assetGallery": [
                {"name": "still", "type": "image", "category": "stills", "url": "a.png"}
            ]
        }"#;
        let def = ProjectDefinition::from_json(json.as_bytes()).unwrap();
        assert_eq!(def.status, ProjectStatus::InProgress);
        assert_eq!(def.kind, ProjectKind::Video);
        assert_eq!(def.media_objects[0].position, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(def.media_objects[1].position, None);
        assert_eq!(def.expected_content_count(), 3);
        def.validate().unwrap();
    }

    #[test]
    fn unknown_media_kind_is_rejected() {
        let json = r#"{"id": 1, "name": "A", "mediaObjects": [{"id": "m", "type": "hologram"}]}"#;
        assert!(ProjectDefinition::from_json(json.as_bytes()).is_err());
    }

    #[test]
    fn missing_name_is_malformed() {
        assert!(ProjectDefinition::from_json(br#"{"id": 1}"#).is_err());
        assert!(ProjectDefinition::from_json(br#"{"id": -1, "name": "n"}"#).is_err());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let mut def = ProjectDefinition::from_json(MINIMAL.as_bytes()).unwrap();
        def.name = "   ".into();
        assert_eq!(def.validate(), Err(ProjectError::EmptyName(ProjectId(3))));
    }

    #[test]
    fn validate_rejects_non_finite_media() {
        let mut def = ProjectDefinition::from_json(MINIMAL.as_bytes()).unwrap();
        def.media_objects.push(MediaObject {
            id: "m".into(),
            kind: MediaKind::Image,
            title: String::new(),
            description: None,
            url: None,
            thumbnail: None,
            position: Some(Vec3::new(0.0, f32::NAN, 0.0)),
            rotation: None,
            scale: None,
        });
        assert!(matches!(def.validate(), Err(ProjectError::NonFinite { .. })));
    }

    #[test]
    fn validate_rejects_duplicate_media_ids() {
        let json = r#"{"id": 1, "name": "A", "mediaObjects": [
            {"id": "m", "type": "image"}, {"id": "m", "type": "video"}
        ]}"#;
        let def = ProjectDefinition::from_json(json.as_bytes()).unwrap();
        assert!(matches!(
            def.validate(),
            Err(ProjectError::DuplicateMediaId { .. })
        ));
    }

    #[test]
    fn name_or_custom_link_lookup() {
        let mut def = ProjectDefinition::from_json(MINIMAL.as_bytes()).unwrap();
        def.custom_link = Some("/orbit-demo/".into());
        assert!(def.matches_name_or_link("orbit"));
        assert!(def.matches_name_or_link("orbit-demo"));
        assert!(def.matches_name_or_link("/orbit-demo"));
        assert!(!def.matches_name_or_link("/"));
        assert!(!def.matches_name_or_link("other"));
    }
}

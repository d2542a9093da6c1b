use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use worldhub_common::{Placement, ProjectId, WorldId};
use worldhub_kernel::{MediaObject, ProjectKind, ProjectRecord, World, WorldObject, WorldObjectKind};

use crate::layout::{ScatterParams, scatter};

/// Object id of the "back to hub" button.
pub const BACK_BUTTON_ID: &str = "back-to-hub";

const WALL_SPACING: f32 = 3.0;
const WALL_HEIGHT: f32 = 2.0;
const WALL_DEPTH: f32 = -8.0;

/// Which client family a subworld is built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Pointer clients, which get an in-world "back to hub" button.
    #[default]
    Desktop,
    /// Touch clients navigate back through their own chrome.
    Touch,
}

/// Object id of the summary card in `project`'s subworld.
pub fn summary_id(project: ProjectId) -> String {
    format!("project-summary-{project}")
}

fn non_empty(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

fn summary_card(project: &ProjectRecord) -> WorldObject {
    let mut card = WorldObject::new(
        summary_id(project.id),
        WorldObjectKind::ProjectCard {
            project_id: project.id,
        },
        &project.name,
    )
    .with_placement(Placement::at(Vec3::new(0.0, 1.5, -4.0)));
    card.description = non_empty(&project.description);
    card.url = match project.kind {
        ProjectKind::Video => project.video_url.clone().or_else(|| non_empty(&project.link)),
        ProjectKind::Standard => non_empty(&project.link),
    };
    card.thumbnail = non_empty(&project.thumbnail);
    card
}

fn back_button() -> WorldObject {
    WorldObject::new(
        BACK_BUTTON_ID,
        WorldObjectKind::Button {
            destination: WorldId::Hub,
        },
        "Back to hub",
    )
    .with_placement(Placement {
        position: Vec3::new(0.0, 1.2, 4.0),
        rotation: Vec3::new(0.0, PI, 0.0),
        scale: Vec3::ONE,
    })
}

fn media_object(media: &MediaObject, placement: Placement) -> WorldObject {
    let mut object = WorldObject::new(format!("media-{}", media.id), media.kind.into(), &media.title)
        .with_placement(placement);
    object.description = media.description.clone();
    object.url = media.url.clone();
    object.thumbnail = media.thumbnail.clone();
    object
}

/// Build the subworld of one project.
///
/// Contents, in order: the summary card, the back button (desktop only),
/// media objects, then gallery assets. Authored media positions are kept;
/// unpositioned media line up along a wall behind the summary card; gallery
/// assets are placed by [`scatter`].
pub fn build_subworld(project: &ProjectRecord, variant: Variant) -> World {
    let mut world = World::with_settings(
        WorldId::Project(project.id),
        &project.name,
        project.world_settings.clone(),
    );

    world.objects.push(summary_card(project));
    if variant == Variant::Desktop {
        world.objects.push(back_button());
    }

    let unpositioned = project
        .media_objects
        .iter()
        .filter(|m| m.position.is_none())
        .count();
    let half_wall = unpositioned.saturating_sub(1) as f32 / 2.0;
    let mut wall_index = 0usize;
    for media in &project.media_objects {
        let position = media.position.unwrap_or_else(|| {
            let x = (wall_index as f32 - half_wall) * WALL_SPACING;
            wall_index += 1;
            Vec3::new(x, WALL_HEIGHT, WALL_DEPTH)
        });
        let placement = Placement {
            position,
            rotation: media.rotation.unwrap_or(Vec3::ZERO),
            scale: media.scale.unwrap_or(Vec3::ONE),
        };
        world.objects.push(media_object(media, placement));
    }

    let slots = scatter(project.asset_gallery.len(), &ScatterParams::default());
    for (index, (asset, slot)) in project.asset_gallery.iter().zip(slots).enumerate() {
        let title = if asset.name.trim().is_empty() {
            format!("Asset {}", index + 1)
        } else {
            asset.name.clone()
        };
        let mut object = WorldObject::new(format!("asset-{index}"), asset.kind.into(), title)
            .with_placement(slot.placement);
        object.description = non_empty(&asset.category);
        object.url = Some(asset.url.clone());
        world.objects.push(object);
    }

    world
}

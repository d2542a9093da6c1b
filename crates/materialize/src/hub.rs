use glam::Vec3;
use serde::{Deserialize, Serialize};
use worldhub_common::{Placement, ProjectId, WorldId};
use worldhub_kernel::{ProjectRecord, World, WorldObject, WorldObjectKind, WorldSettings};

/// Appearance and card grid of the hub world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    pub name: String,
    pub environment: WorldSettings,
    /// Cards per grid row for cards without a previous position.
    pub columns: usize,
    pub spacing: f32,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            name: "Hub".into(),
            environment: WorldSettings::default(),
            columns: 4,
            spacing: 6.0,
        }
    }
}

/// Object id of the hub card for `project`.
pub fn card_id(project: ProjectId) -> String {
    format!("project-card-{project}")
}

/// Grid slot for the `index`-th card: rows recede along -Z, centred on X.
pub fn default_card_placement(index: usize, settings: &HubSettings) -> Placement {
    let columns = settings.columns.max(1);
    let col = (index % columns) as f32;
    let row = (index / columns) as f32;
    let half_width = (columns - 1) as f32 / 2.0;
    Placement::at(Vec3::new(
        (col - half_width) * settings.spacing,
        1.5,
        -(row + 1.0) * settings.spacing,
    ))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

/// Build the hub: one card per project, in project order.
///
/// Cards that already exist in `previous` keep their placement. Every
/// non-card object of `previous` (fixed scenery) is carried over verbatim,
/// ahead of the cards.
pub fn build_hub_world(
    projects: &[ProjectRecord],
    previous: Option<&World>,
    settings: &HubSettings,
) -> World {
    let mut hub = World::with_settings(WorldId::Hub, &settings.name, settings.environment.clone());

    if let Some(previous) = previous {
        hub.objects.extend(
            previous
                .objects
                .iter()
                .filter(|o| o.card_project().is_none())
                .cloned(),
        );
    }

    for (index, project) in projects.iter().enumerate() {
        let placement = previous
            .and_then(|p| p.project_card(project.id))
            .map(|card| card.placement)
            .unwrap_or_else(|| default_card_placement(index, settings));

        let mut card = WorldObject::new(
            card_id(project.id),
            WorldObjectKind::ProjectCard {
                project_id: project.id,
            },
            &project.name,
        )
        .with_placement(placement);
        card.description = non_empty(&project.description);
        card.url = non_empty(&project.link);
        card.thumbnail = non_empty(&project.thumbnail);
        hub.objects.push(card);
    }

    hub
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, name: &str) -> ProjectRecord {
        ProjectRecord::from_json(
            format!(r#"{{"id": {id}, "name": "{name}", "link": "https://example.com/{id}"}}"#)
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn empty_catalog_gives_valid_empty_hub() {
        let hub = build_hub_world(&[], None, &HubSettings::default());
        assert_eq!(hub.id, WorldId::Hub);
        assert_eq!(hub.project_cards().count(), 0);
        hub.validate().unwrap();
    }

    #[test]
    fn one_card_per_project_in_order() {
        let projects = vec![record(2, "Beta"), record(1, "Alpha")];
        let hub = build_hub_world(&projects, None, &HubSettings::default());
        let cards: Vec<_> = hub.project_cards().map(|c| c.card_project()).collect();
        assert_eq!(cards, vec![Some(ProjectId(2)), Some(ProjectId(1))]);
        let card = hub.object("project-card-2").unwrap();
        assert_eq!(card.title, "Beta");
        assert_eq!(card.url.as_deref(), Some("https://example.com/2"));
        assert_eq!(card.description, None);
        hub.validate().unwrap();
    }

    #[test]
    fn previous_positions_survive_rebuild() {
        let settings = HubSettings::default();
        let first = build_hub_world(&[record(1, "Alpha")], None, &settings);
        let mut moved = first.clone();
        moved.objects[0].placement.position = Vec3::new(40.0, 0.0, 2.0);

        // Alpha now sits at index 1, which would get a different default slot.
        let rebuilt = build_hub_world(&[record(5, "Eps"), record(1, "Alpha")], Some(&moved), &settings);
        assert_eq!(
            rebuilt.project_card(ProjectId(1)).unwrap().placement.position,
            Vec3::new(40.0, 0.0, 2.0)
        );
        assert_eq!(
            rebuilt.project_card(ProjectId(5)).unwrap().placement,
            default_card_placement(0, &settings)
        );
    }

    #[test]
    fn scenery_is_preserved_and_removed_projects_dropped() {
        let settings = HubSettings::default();
        let mut previous = build_hub_world(&[record(1, "Alpha"), record(2, "Beta")], None, &settings);
        let fountain = WorldObject::new("fountain", WorldObjectKind::Image, "Fountain")
            .with_placement(Placement::at(Vec3::new(0.0, 0.0, 3.0)));
        previous.objects.push(fountain.clone());

        let rebuilt = build_hub_world(&[record(2, "Beta")], Some(&previous), &settings);
        assert_eq!(rebuilt.objects[0], fountain);
        assert_eq!(rebuilt.project_cards().count(), 1);
        assert!(rebuilt.project_card(ProjectId(1)).is_none());
    }

    #[test]
    fn rebuild_does_not_mutate_inputs() {
        let projects = vec![record(1, "Alpha")];
        let previous = build_hub_world(&projects, None, &HubSettings::default());
        let snapshot = (projects.clone(), previous.clone());
        let _ = build_hub_world(&projects, Some(&previous), &HubSettings::default());
        assert_eq!((projects, previous), snapshot);
    }

    #[test]
    fn default_grid_is_centred() {
        let settings = HubSettings::default();
        let first = default_card_placement(0, &settings).position;
        let last = default_card_placement(3, &settings).position;
        assert_eq!(first.x, -last.x);
        assert_eq!(first.z, last.z);
        let next_row = default_card_placement(4, &settings).position;
        assert!(next_row.z < first.z);
    }
}

//! Kernel: the data model shared by every engine component.
//!
//! # Invariants
//! - World object kinds form a closed set; unknown discriminants fail to parse.
//! - Every vector component reachable from a validated project or world is finite.

pub mod project;
pub mod world;

pub use project::{
    AssetGalleryEntry, Light, MediaKind, MediaObject, ProjectDefinition, ProjectError,
    ProjectKind, ProjectRecord, ProjectStatus, WorldSettings,
};
pub use world::{World, WorldError, WorldObject, WorldObjectKind};

//! Shared types and utilities for the worldhub engine.
//!
//! # Invariants
//! - World ids only ever take the two reserved forms (`mainWorld`, `project-world-<id>`).
//! - The layout hash is a pure function of its seed; no entropy source is consulted.

pub mod rng;
pub mod types;

pub use rng::SeededRng;
pub use types::{Placement, ProjectId, WorldId, WorldIdError};

//! Materialization: turning project records into renderable worlds.
//!
//! # Invariants
//! - Every builder is a pure function of its arguments; inputs are never mutated.
//! - Identical records in identical order produce bit-identical placements.
//! - No source of true randomness is consulted.

mod hub;
mod layout;
mod subworld;

pub use hub::{HubSettings, build_hub_world, card_id, default_card_placement};
pub use layout::{ScatterParams, ScatterSlot, cluster_count, scatter};
pub use subworld::{BACK_BUTTON_ID, Variant, build_subworld, summary_id};

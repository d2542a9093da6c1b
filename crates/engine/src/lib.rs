//! The world resolution engine: definition loading, reconciliation into the
//! record store, world materialization, caching and navigation behind one
//! [`Engine`] handle.
//!
//! # Invariants
//! - `initialize` runs at most one load at a time; concurrent callers share it.
//! - The world cache is swapped whole on refresh and forced reload.
//! - Navigation always ends in a world: unresolvable targets land on the hub.

pub mod cache;
pub mod config;
mod engine;
pub mod navigator;

pub use cache::{CacheError, StalenessPolicy, WorldService};
pub use config::{ConfigError, EngineConfig, StoreKeys};
pub use engine::{Engine, EngineError};
pub use navigator::{NavState, Navigator, ResolveError, WorldResolver};

//! Streaming: fetching per-project definition documents from a slug catalog.
//!
//! # Invariants
//! - One missing, slow or malformed document never fails or blocks the batch.
//! - Results come back in catalog order whatever order the fetches finish in.

mod loader;
mod source;

pub use loader::{DefinitionLoader, LoadReport, LoaderConfig, SkippedDefinition};
pub use source::{DefinitionSource, DirDefinitionSource, HttpDefinitionSource, LoadError};

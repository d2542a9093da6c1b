//! Persistence: key-value backends, the project record store and the world cache store.
//!
//! # Invariants
//! - Every write replaces a whole collection; there are no partial updates.
//! - The record backup is byte-identical to the primary after every write.
//! - An unreadable collection is recovered from its backup or treated as empty,
//!   never surfaced as a crash.

mod codec;
mod kv;
mod records;
mod worlds;

pub use codec::{SCHEMA_VERSION, StoreError};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use records::{RecordKeys, RecordStore};
pub use worlds::WorldCacheStore;

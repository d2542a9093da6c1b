//! Authoring: reconciling loaded definitions into the record store, and
//! admin edits of individual records.
//!
//! # Invariants
//! - No committed collection holds two records with the same id or the same
//!   (case-insensitive) name.
//! - Every commit replaces the whole collection.

mod editor;
mod reconcile;

pub use editor::{EditError, RecordEditor, SaveOutcome};
pub use reconcile::{
    ConflictPolicy, ReconcileError, Reconciliation, Reconciler, RejectReason, Rejection, reconcile,
};

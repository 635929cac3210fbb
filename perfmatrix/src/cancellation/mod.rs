//! Cleanup guarantees for transient artifacts.
//!
//! This module provides:
//! - `remove` for best-effort, idempotent deletion of a path list
//! - `ArtifactCleaner` for LIFO removal of registered paths
//! - `ArtifactScope`, a guard that removes its paths on every exit path

mod cleanup;

pub use cleanup::{remove, ArtifactCleaner, ArtifactScope, CleanupReport};

//! Session-scoped persistence.

pub mod snapshot;

pub use snapshot::SnapshotStore;

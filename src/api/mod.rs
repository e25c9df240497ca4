//! HTTP layer: tag snapshots and the topology description.
//!
//! Snapshots live under `/api/v1/{device}`; the graph description the
//! layout engine consumes is served at `/data.json`.

pub mod snapshot;
pub mod topology;

pub use snapshot::{SnapshotFetcher, SnapshotSource};

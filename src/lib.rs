//! # Linkback
//!
//! The join and load-balancing core of an entity-resolution pipeline.
//!
//! This library provides two pieces: a load-balanced splitter that turns
//! oversized inverted-index posting lists into bounded self-join and
//! cross-join comparison units, and a reduce-side tagged-union join that
//! reattaches cluster assignments to entry metadata using only
//! partition/sort/group primitives, with no shared state between shards.

pub mod config;
pub mod join;
pub mod key;
pub mod model;
pub mod pipeline;
pub mod shuffle;
pub mod splitter;
pub mod test_support;

// Re-export main types for convenience
pub use config::{JoinConfig, LinkbackConfig, SplitConfig};
pub use join::{JoinStats, JoinValue, MergeReducer};
pub use key::CompositeKey;
pub use model::{
    AssignmentRecord, ClusterId, ContainerId, GroupWeight, JoinedOutput, PayloadRecord,
    PostingEntry, SegmentRole, WorkUnit,
};
pub use pipeline::{LinkBackJob, SplitJob, TaskBatch};
pub use splitter::Splitter;

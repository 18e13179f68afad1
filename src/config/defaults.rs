//! Default constants for linkback configuration.
//!
//! All magic numbers are centralized here with documentation.

// =============================================================================
// Splitter Defaults
// =============================================================================

/// Default number of segments an oversized posting list is divided into.
/// Yields `split_count` self-join units and `C(split_count, 2)` cross-join
/// units per oversized list, independent of list length.
pub const DEFAULT_SPLIT_COUNT: usize = 6;

/// Default posting-list length above which splitting activates.
/// Lists at or below this length go whole to a single self-join container.
pub const DEFAULT_LENGTH_THRESHOLD: usize = 1000;

// =============================================================================
// Join Defaults
// =============================================================================

/// Default number of reduce shards when not specified.
/// Uses number of CPU cores for optimal parallelism.
pub fn default_shard_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(8)
}

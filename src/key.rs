//! # Composite Keys
//!
//! The keying protocol shared by the splitter and the link-back join: a
//! composite key with a primary grouping field and secondary ordering
//! fields, the partition function that routes on the primary field alone,
//! and the sort/group comparator pair the shuffle applies.

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Tag carried by assignment records. Numerically smallest so that the
/// assignment sorts before every payload record in its group.
pub const TAG_ASSIGNMENT: u8 = 0;

/// Tag carried by payload records.
pub const TAG_PAYLOAD: u8 = 1;

/// An ordered composite key: a primary grouping field plus secondary
/// ordering fields.
///
/// The derived ordering is lexicographic over `(primary, tag, order)`,
/// which is exactly the sort comparator the shuffle needs: records group
/// by `primary`, and within a group the lowest tag sorts first, ties
/// broken by emission order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompositeKey<P> {
    /// The grouping field; the only field partition routing sees
    pub primary: P,
    /// Record-role discriminator controlling sort precedence in a group
    pub tag: u8,
    /// Emission order, keeping the full sort total
    pub order: u32,
}

impl<P> CompositeKey<P> {
    /// Create a new composite key
    pub fn new(primary: P, tag: u8, order: u32) -> Self {
        Self {
            primary,
            tag,
            order,
        }
    }
}

/// Group comparator: two keys delimit the same logical group when their
/// primary fields are equal, regardless of tag or order.
pub fn same_group<P: PartialEq>(a: &CompositeKey<P>, b: &CompositeKey<P>) -> bool {
    a.primary == b.primary
}

/// Partition function: route a key to a shard by its primary field alone.
///
/// Ignoring `tag` and `order` is what lets one reducer see every record of
/// a logical group. `FxHasher` is unseeded, so routing is stable across
/// re-executions, not just within one run.
pub fn shard_for<P: Hash>(key: &CompositeKey<P>, num_shards: usize) -> usize {
    let mut hasher = FxHasher::default();
    key.primary.hash(&mut hasher);
    (hasher.finish() as usize) % num_shards.max(1)
}

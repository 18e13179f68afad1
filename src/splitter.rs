//! # Load-Balanced Splitter
//!
//! Turns one oversized posting list into a bounded set of self-join and
//! cross-join work units, so that no single comparison task receives an
//! unbounded amount of work.
//!
//! Two strategies apply. A short list (within the length threshold) is sent
//! whole to one container for a self join. A long list is divided into
//! `split_count` contiguous segments: each segment becomes a self-join
//! unit, and each segment pair becomes a cross-join unit. Every unordered
//! pair of the original list is covered by exactly one emitted unit.

use crate::config::SplitConfig;
use crate::key::CompositeKey;
use crate::model::{ContainerClass, ContainerId, PostingEntry, SegmentRole, WorkUnit};
use tracing::debug;

/// A keyed work unit emitted by the splitter. The key's primary field is
/// the encoded [`ContainerId`]; the tag is the unit's segment role.
pub type SplitEmission = (CompositeKey<u64>, WorkUnit);

/// Stateful splitter for one parallel producer task.
///
/// Holds the two monotonic container counters as instance fields; construct
/// one splitter per parallel task, never share one across tasks. Container
/// ids are namespaced by `task_id`, so two tasks counting independently can
/// never allocate colliding containers. A re-executed task rebuilt with the
/// same `task_id` reproduces identical ids.
#[derive(Debug)]
pub struct Splitter {
    task_id: u16,
    config: SplitConfig,
    /// Container sequence for threshold-bounded lists
    small_seq: u32,
    /// Container sequence for split lists
    big_seq: u32,
}

impl Splitter {
    /// Create a splitter for one producer task. The config is validated at
    /// load time; see [`SplitConfig::validate`].
    pub fn new(task_id: u16, config: SplitConfig) -> Self {
        Self {
            task_id,
            config,
            small_seq: 0,
            big_seq: 0,
        }
    }

    /// The task this splitter allocates containers for
    pub fn task_id(&self) -> u16 {
        self.task_id
    }

    /// Split one posting list into keyed work units.
    ///
    /// - `n <= 1`: nothing to compare, nothing emitted.
    /// - `1 < n <= length_threshold`: one whole-list self-join unit.
    /// - `n > length_threshold`: `split_count` self-join units plus
    ///   `C(split_count, 2)` cross-join units over segments of length
    ///   `ceil(n / split_count)` (the last segment absorbs the remainder).
    pub fn split(&mut self, entry: &PostingEntry) -> Vec<SplitEmission> {
        let n = entry.postings.len();
        if n <= 1 {
            return Vec::new();
        }

        if n <= self.config.length_threshold {
            let key = self.next_key(ContainerClass::Small, SegmentRole::SelfJoin);
            return vec![(key, WorkUnit::SelfJoin(entry.postings.clone()))];
        }

        let segment_len = n.div_ceil(self.config.split_count);
        // Ceil sizing can leave trailing segments empty when n is barely
        // above a tiny threshold; chunks() yields only the non-empty ones.
        let segments: Vec<&[crate::model::GroupWeight]> =
            entry.postings.chunks(segment_len).collect();

        debug!(
            term = %entry.term,
            postings = n,
            segments = segments.len(),
            segment_len,
            "splitting oversized posting list"
        );

        let mut emissions =
            Vec::with_capacity(segments.len() * (segments.len() + 1) / 2);
        for (i, segment) in segments.iter().enumerate() {
            let key = self.next_key(ContainerClass::Big, SegmentRole::SelfJoin);
            emissions.push((key, WorkUnit::SelfJoin(segment.to_vec())));

            for other in &segments[i + 1..] {
                let key = self.next_key(ContainerClass::Big, SegmentRole::Cross);
                emissions.push((
                    key,
                    WorkUnit::Cross {
                        left: segment.to_vec(),
                        right: other.to_vec(),
                    },
                ));
            }
        }
        emissions
    }

    fn next_key(&mut self, class: ContainerClass, role: SegmentRole) -> CompositeKey<u64> {
        let seq = match class {
            ContainerClass::Small => {
                let seq = self.small_seq;
                self.small_seq = self.small_seq.saturating_add(1);
                seq
            }
            ContainerClass::Big => {
                let seq = self.big_seq;
                self.big_seq = self.big_seq.saturating_add(1);
                seq
            }
        };
        let container = ContainerId::new(self.task_id, class, seq);
        CompositeKey::new(container.to_u64(), role.as_tag(), 0)
    }
}

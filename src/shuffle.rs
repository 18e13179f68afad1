//! # In-Process Shuffle Substrate
//!
//! A single-host implementation of the shuffle contract the pipeline is
//! written against: collect keyed emissions from arbitrarily many
//! producers, route each record to a shard by the key's primary field,
//! sort each shard by the full composite key, and expose the records to
//! the consumer grouped by primary field.
//!
//! A distributed substrate providing the same contract can replace this
//! module wholesale; nothing downstream observes the difference.

use crate::key::{same_group, shard_for, CompositeKey};
use std::hash::Hash;

/// Collector for keyed emissions, prior to partitioning.
#[derive(Debug)]
pub struct Shuffle<P, V> {
    records: Vec<(CompositeKey<P>, V)>,
}

impl<P, V> Default for Shuffle<P, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, V> Shuffle<P, V> {
    /// Create an empty collector
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Accept one keyed record
    pub fn emit(&mut self, key: CompositeKey<P>, value: V) {
        self.records.push((key, value));
    }

    /// Accept a batch of keyed records
    pub fn extend(&mut self, records: impl IntoIterator<Item = (CompositeKey<P>, V)>) {
        self.records.extend(records);
    }

    /// Number of collected records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been emitted yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<P: Ord + Hash, V> Shuffle<P, V> {
    /// Partition the collected records into `num_shards` sorted shard runs.
    ///
    /// Every record with the same primary field lands in the same run. The
    /// sort is stable, so records whose full keys tie keep emission order;
    /// re-running this over the same emissions reproduces identical runs.
    pub fn into_shards(self, num_shards: usize) -> Vec<ShardRun<P, V>> {
        let num_shards = num_shards.max(1);
        let mut buckets: Vec<Vec<(CompositeKey<P>, V)>> =
            (0..num_shards).map(|_| Vec::new()).collect();
        for (key, value) in self.records {
            let shard = shard_for(&key, num_shards);
            buckets[shard].push((key, value));
        }

        buckets
            .into_iter()
            .map(|mut records| {
                records.sort_by(|a, b| a.0.cmp(&b.0));
                ShardRun { records }
            })
            .collect()
    }
}

/// One shard's sorted record run, exposed to a consumer group by group.
#[derive(Debug)]
pub struct ShardRun<P, V> {
    records: Vec<(CompositeKey<P>, V)>,
}

impl<P, V> ShardRun<P, V> {
    /// Number of records routed to this shard
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether this shard received no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<P: PartialEq, V> ShardRun<P, V> {
    /// Visit each logical group in key order, presenting the group's
    /// primary field and its ordered value sequence.
    pub fn for_each_group<F>(&self, mut visit: F)
    where
        F: FnMut(&P, GroupValues<'_, P, V>),
    {
        let mut start = 0;
        while start < self.records.len() {
            let mut end = start + 1;
            while end < self.records.len()
                && same_group(&self.records[start].0, &self.records[end].0)
            {
                end += 1;
            }
            visit(
                &self.records[start].0.primary,
                GroupValues {
                    inner: self.records[start..end].iter(),
                },
            );
            start = end;
        }
    }
}

/// Ordered value sequence of one logical group.
#[derive(Debug)]
pub struct GroupValues<'a, P, V> {
    inner: std::slice::Iter<'a, (CompositeKey<P>, V)>,
}

impl<'a, P, V> Iterator for GroupValues<'a, P, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

//! # Job Facades
//!
//! Wires the pipeline stages together over the in-process shuffle: the
//! split job fans posting lists out to parallel splitter tasks, and the
//! link-back job runs the full partition/sort/group/reduce loop that
//! attaches cluster ids to entry metadata.

use crate::config::{ConfigError, JoinConfig, SplitConfig};
use crate::join::{join_key, JoinStats, JoinValue, MergeReducer};
use crate::model::{AssignmentRecord, JoinedOutput, PayloadRecord, PostingEntry, WorkUnit};
use crate::shuffle::{ShardRun, Shuffle};
use crate::splitter::{SplitEmission, Splitter};
use anyhow::Result;
use tracing::{debug, instrument};

/// One parallel producer task's slice of the posting-list input.
#[derive(Debug, Clone)]
pub struct TaskBatch {
    /// Task identity, namespacing the containers this batch allocates
    pub task_id: u16,
    /// The posting lists this task splits
    pub entries: Vec<PostingEntry>,
}

impl TaskBatch {
    /// Create a new task batch
    pub fn new(task_id: u16, entries: Vec<PostingEntry>) -> Self {
        Self { task_id, entries }
    }
}

/// The split job: runs one splitter per task batch in parallel and returns
/// the keyed work units in task order.
#[derive(Debug, Clone)]
pub struct SplitJob {
    config: SplitConfig,
}

impl SplitJob {
    /// Create a split job with a validated configuration
    pub fn new(config: SplitConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Split every batch, one splitter instance per task.
    ///
    /// Batches run on their own threads; results are joined in submission
    /// order, so the emission sequence is deterministic regardless of
    /// thread scheduling.
    #[instrument(skip_all, fields(batches = batches.len()))]
    pub fn run(&self, batches: Vec<TaskBatch>) -> Result<Vec<SplitEmission>> {
        let mut handles = Vec::with_capacity(batches.len());
        for batch in batches {
            let config = self.config.clone();
            handles.push(std::thread::spawn(move || -> Result<Vec<SplitEmission>> {
                let mut splitter = Splitter::new(batch.task_id, config);
                let mut emissions = Vec::new();
                for entry in &batch.entries {
                    emissions.extend(splitter.split(entry));
                }
                Ok(emissions)
            }));
        }

        let mut emissions = Vec::new();
        for handle in handles {
            emissions.extend(handle.join().expect("splitter thread panicked")?);
        }

        debug!(work_units = emissions.len(), "split job finished");
        Ok(emissions)
    }

    /// Route split emissions to comparison shards, sorted and grouped the
    /// way the downstream similarity stage consumes them.
    pub fn shard(emissions: Vec<SplitEmission>, num_shards: usize) -> Vec<ShardRun<u64, WorkUnit>> {
        let mut shuffle = Shuffle::new();
        shuffle.extend(emissions);
        shuffle.into_shards(num_shards)
    }
}

/// The link-back join job: merges a cluster-assignment stream with an
/// entry-metadata stream by group id.
#[derive(Debug, Clone)]
pub struct LinkBackJob {
    config: JoinConfig,
}

impl LinkBackJob {
    /// Create a link-back job with a validated configuration
    pub fn new(config: JoinConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Join typed assignment and payload streams.
    #[instrument(skip_all, fields(assignments = assignments.len(), payloads = payloads.len()))]
    pub fn run(
        &self,
        assignments: &[AssignmentRecord],
        payloads: &[PayloadRecord],
    ) -> Result<(Vec<JoinedOutput>, JoinStats)> {
        let mut values = Vec::with_capacity(assignments.len() + payloads.len());
        for record in assignments {
            values.push((record.group_id.clone(), JoinValue::from_assignment(record)));
        }
        for record in payloads {
            values.push((record.group_id.clone(), JoinValue::from_payload(record)));
        }
        self.run_values(values)
    }

    /// Join a raw tagged value stream, as read off the wire.
    ///
    /// Each shard's group sequence is reduced on its own thread with no
    /// shared state; outputs are concatenated in shard index order, so the
    /// result is deterministic under re-execution.
    pub fn run_values(
        &self,
        values: Vec<(String, JoinValue)>,
    ) -> Result<(Vec<JoinedOutput>, JoinStats)> {
        let mut shuffle = Shuffle::new();
        for (order, (group_id, value)) in values.into_iter().enumerate() {
            let key = join_key(&group_id, &value, order as u32);
            shuffle.emit(key, value);
        }

        let shards = shuffle.into_shards(self.config.shard_count);
        let mut handles = Vec::with_capacity(shards.len());
        for (idx, run) in shards.into_iter().enumerate() {
            handles.push(std::thread::spawn(
                move || -> Result<(usize, Vec<JoinedOutput>, JoinStats)> {
                    let mut reducer = MergeReducer::new();
                    let mut out = Vec::new();
                    run.for_each_group(|group_id, group_values| {
                        reducer.reduce_group(group_id.as_str(), group_values, &mut out);
                    });
                    Ok((idx, out, reducer.stats()))
                },
            ));
        }

        let mut per_shard: Vec<Option<(Vec<JoinedOutput>, JoinStats)>> =
            (0..self.config.shard_count).map(|_| None).collect();
        for handle in handles {
            let (idx, out, stats) = handle.join().expect("reduce thread panicked")?;
            per_shard[idx] = Some((out, stats));
        }

        let mut joined = Vec::new();
        let mut stats = JoinStats::default();
        for shard in per_shard.into_iter().flatten() {
            joined.extend(shard.0);
            stats.merge(&shard.1);
        }

        debug!(
            emitted = stats.emitted,
            malformed = stats.malformed,
            unassigned_dropped = stats.unassigned_dropped,
            "link-back join finished"
        );
        Ok((joined, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClusterId, GroupWeight};

    fn posting_entry(term: &str, n: usize) -> PostingEntry {
        let postings = (0..n)
            .map(|i| GroupWeight::new(format!("{term}-g{i}"), 1.0))
            .collect();
        PostingEntry::new(term, postings)
    }

    #[test]
    fn test_split_job_runs_batches_in_parallel_without_collision() {
        let job = SplitJob::new(SplitConfig::new(3, 10).unwrap()).unwrap();
        let batches = vec![
            TaskBatch::new(0, vec![posting_entry("a", 30), posting_entry("b", 4)]),
            TaskBatch::new(1, vec![posting_entry("c", 30)]),
        ];
        let emissions = job.run(batches).unwrap();

        let mut containers = std::collections::HashSet::new();
        for (key, _) in &emissions {
            assert!(containers.insert(key.primary), "container id collision");
        }
        // 3 self + 3 cross per oversized list, 1 self for the short one.
        assert_eq!(emissions.len(), 6 + 1 + 6);
    }

    #[test]
    fn test_split_job_shard_routing_ignores_role() {
        let job = SplitJob::new(SplitConfig::new(3, 10).unwrap()).unwrap();
        let emissions = job
            .run(vec![TaskBatch::new(0, vec![posting_entry("a", 30)])])
            .unwrap();

        let total: usize = SplitJob::shard(emissions, 4)
            .iter()
            .map(|run| run.len())
            .sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_link_back_joins_group_42() {
        let job = LinkBackJob::new(JoinConfig { shard_count: 4 }).unwrap();
        let assignments = vec![
            AssignmentRecord::new("42", ClusterId(3)),
            AssignmentRecord::new("7", ClusterId(9)),
        ];
        let payloads = vec![
            PayloadRecord::new("42", "101@@42", vec!["Widget".to_string()]),
            PayloadRecord::new("7", "900@@7", vec![]),
            PayloadRecord::new("42", "102@@42", vec![]),
        ];

        let (joined, stats) = job.run(&assignments, &payloads).unwrap();
        let mut pairs: Vec<(u32, String)> = joined
            .iter()
            .map(|out| (out.cluster_id.0, out.text.clone()))
            .collect();
        pairs.sort();

        assert_eq!(
            pairs,
            vec![
                (3, "101@@42".to_string()),
                (3, "102@@42".to_string()),
                (9, "900@@7".to_string()),
            ]
        );
        assert_eq!(stats.emitted, 3);
    }

    #[test]
    fn test_link_back_payload_order_preserved_within_group() {
        let job = LinkBackJob::new(JoinConfig { shard_count: 1 }).unwrap();
        let assignments = vec![AssignmentRecord::new("g", ClusterId(7))];
        let payloads = (0..10)
            .map(|i| PayloadRecord::new("g", format!("e{i}@@g"), vec![]))
            .collect::<Vec<_>>();

        let (joined, _) = job.run(&assignments, &payloads).unwrap();
        let texts: Vec<&str> = joined.iter().map(|out| out.text.as_str()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("e{i}@@g")).collect();
        assert_eq!(texts, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_link_back_is_deterministic_across_runs() {
        let job = LinkBackJob::new(JoinConfig { shard_count: 8 }).unwrap();
        let assignments: Vec<AssignmentRecord> = (0..40)
            .map(|i| AssignmentRecord::new(format!("g{i}"), ClusterId(i)))
            .collect();
        let payloads: Vec<PayloadRecord> = (0..200)
            .map(|i| PayloadRecord::new(format!("g{}", i % 40), format!("e{i}@@x"), vec![]))
            .collect();

        let first = job.run(&assignments, &payloads).unwrap();
        let second = job.run(&assignments, &payloads).unwrap();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }
}

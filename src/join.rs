//! # Tagged-Union Merge Reducer
//!
//! The reduce side of the link-back join. Each logical group arrives as an
//! ordered value sequence in which the single assignment record (lowest
//! tag) precedes every payload record. The reducer buffers the assignment's
//! cluster id as scalar state and applies it to each subsequent payload,
//! never materializing the payload side.

use crate::key::{CompositeKey, TAG_ASSIGNMENT, TAG_PAYLOAD};
use crate::model::{AssignmentRecord, ClusterId, JoinedOutput, PayloadRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One value of the join's tagged union, carrying the raw value text the
/// shuffle delivered. Parsing happens in the reducer so that a malformed
/// record skips a single value, never a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinValue {
    /// Cluster id text from the MST result
    Assignment(String),
    /// `entry@@field::metadata` text from the intermediate result
    Payload(String),
}

impl JoinValue {
    /// The sort tag this value's key carries
    pub fn tag(&self) -> u8 {
        match self {
            JoinValue::Assignment(_) => TAG_ASSIGNMENT,
            JoinValue::Payload(_) => TAG_PAYLOAD,
        }
    }

    /// Build an assignment value from a typed record
    pub fn from_assignment(record: &AssignmentRecord) -> Self {
        JoinValue::Assignment(record.cluster_id.0.to_string())
    }

    /// Build a payload value from a typed record
    pub fn from_payload(record: &PayloadRecord) -> Self {
        JoinValue::Payload(record.to_wire())
    }
}

/// Build the composite key for a join value. Assignments take order 0;
/// payloads carry their emission sequence so input order survives the sort.
pub fn join_key(group_id: &str, value: &JoinValue, order: u32) -> CompositeKey<String> {
    CompositeKey::new(group_id.to_string(), value.tag(), order)
}

/// Diagnostics counters for one reduce pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStats {
    /// Joined records emitted
    pub emitted: u64,
    /// Values that failed to parse and were skipped
    pub malformed: u64,
    /// Payload records dropped because their group had no assignment
    pub unassigned_dropped: u64,
}

impl JoinStats {
    /// Fold another pass's counters into this one
    pub fn merge(&mut self, other: &JoinStats) {
        self.emitted += other.emitted;
        self.malformed += other.malformed;
        self.unassigned_dropped += other.unassigned_dropped;
    }
}

/// Per-group join state: either no cluster is known yet, or the group's
/// assignment has been seen and bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupState {
    Start,
    Bound(ClusterId),
}

/// The merge reducer. One instance serves one shard; state never carries
/// across groups, so re-executing a shard reproduces identical output.
#[derive(Debug, Default)]
pub struct MergeReducer {
    stats: JoinStats,
}

impl MergeReducer {
    /// Create a new reducer
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> JoinStats {
        self.stats
    }

    /// Reduce one group's ordered value sequence, appending joined records
    /// to `out` in payload input order.
    ///
    /// Payloads seen before any assignment are dropped: with no cluster to
    /// attach to there is nothing to join. The sort guarantee makes that
    /// ordering impossible within a well-formed group; a group whose
    /// assignment is missing entirely takes the same path and is counted.
    pub fn reduce_group<'a, I>(&mut self, group_id: &str, values: I, out: &mut Vec<JoinedOutput>)
    where
        I: IntoIterator<Item = &'a JoinValue>,
    {
        let mut state = GroupState::Start;
        let mut dropped = 0u64;

        for value in values {
            match value {
                JoinValue::Assignment(raw) => match raw.trim().parse::<u32>() {
                    Ok(cluster) => state = GroupState::Bound(ClusterId(cluster)),
                    Err(_) => self.stats.malformed += 1,
                },
                JoinValue::Payload(raw) => match state {
                    GroupState::Bound(cluster_id) => {
                        // The joined text is the entry portion before the
                        // first metadata delimiter.
                        let text = raw.split_once("::").map_or(raw.as_str(), |(entry, _)| entry);
                        out.push(JoinedOutput::new(cluster_id, text));
                        self.stats.emitted += 1;
                    }
                    GroupState::Start => dropped += 1,
                },
            }
        }

        if dropped > 0 {
            debug!(group_id, dropped, "payloads without cluster assignment");
            self.stats.unassigned_dropped += dropped;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduce(group_id: &str, values: &[JoinValue]) -> (Vec<JoinedOutput>, JoinStats) {
        let mut reducer = MergeReducer::new();
        let mut out = Vec::new();
        reducer.reduce_group(group_id, values, &mut out);
        (out, reducer.stats())
    }

    #[test]
    fn test_assignment_applies_to_every_payload_in_order() {
        let values = vec![
            JoinValue::Assignment("7".to_string()),
            JoinValue::Payload("e1@@g1::Widget##A".to_string()),
            JoinValue::Payload("e2@@g1::Widget##B".to_string()),
        ];
        let (out, stats) = reduce("g1", &values);

        assert_eq!(
            out,
            vec![
                JoinedOutput::new(ClusterId(7), "e1@@g1"),
                JoinedOutput::new(ClusterId(7), "e2@@g1"),
            ]
        );
        assert_eq!(stats.emitted, 2);
        assert_eq!(stats.malformed, 0);
        assert_eq!(stats.unassigned_dropped, 0);
    }

    #[test]
    fn test_payload_without_metadata_passes_through_whole() {
        let values = vec![
            JoinValue::Assignment("7".to_string()),
            JoinValue::Payload("e1@@g1".to_string()),
        ];
        let (out, _) = reduce("g1", &values);
        assert_eq!(out, vec![JoinedOutput::new(ClusterId(7), "e1@@g1")]);
    }

    #[test]
    fn test_group_without_assignment_emits_nothing() {
        let values = vec![
            JoinValue::Payload("e1@@g1".to_string()),
            JoinValue::Payload("e2@@g1".to_string()),
        ];
        let (out, stats) = reduce("g1", &values);

        assert!(out.is_empty());
        assert_eq!(stats.unassigned_dropped, 2);
    }

    #[test]
    fn test_malformed_assignment_skips_value_not_group() {
        let values = vec![
            JoinValue::Assignment("not-a-number".to_string()),
            JoinValue::Payload("e1@@g1".to_string()),
        ];
        let (out, stats) = reduce("g1", &values);

        assert!(out.is_empty());
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.unassigned_dropped, 1);
    }

    #[test]
    fn test_state_resets_between_groups() {
        let mut reducer = MergeReducer::new();
        let mut out = Vec::new();

        reducer.reduce_group(
            "g1",
            &[
                JoinValue::Assignment("3".to_string()),
                JoinValue::Payload("e1@@g1".to_string()),
            ],
            &mut out,
        );
        // The next group has no assignment; g1's cluster must not leak.
        reducer.reduce_group("g2", &[JoinValue::Payload("e9@@g2".to_string())], &mut out);

        assert_eq!(out, vec![JoinedOutput::new(ClusterId(3), "e1@@g1")]);
        assert_eq!(reducer.stats().unassigned_dropped, 1);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = JoinStats::default();
        total.merge(&JoinStats {
            emitted: 2,
            malformed: 1,
            unassigned_dropped: 0,
        });
        total.merge(&JoinStats {
            emitted: 3,
            malformed: 0,
            unassigned_dropped: 4,
        });
        assert_eq!(
            total,
            JoinStats {
                emitted: 5,
                malformed: 1,
                unassigned_dropped: 4,
            }
        );
    }
}

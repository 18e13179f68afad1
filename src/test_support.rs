//! Seeded dataset generators shared by integration tests and benchmarks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{AssignmentRecord, ClusterId, GroupWeight, PayloadRecord, PostingEntry};

/// A generated join workload: one assignment per group plus a payload
/// stream referencing those groups.
#[derive(Debug, Clone)]
pub struct JoinDataset {
    pub assignments: Vec<AssignmentRecord>,
    pub payloads: Vec<PayloadRecord>,
}

/// Generate posting lists with lengths drawn from `min_len..=max_len`.
pub fn generate_posting_entries(
    count: usize,
    min_len: usize,
    max_len: usize,
    seed: u64,
) -> Vec<PostingEntry> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|term_idx| {
            let len = rng.random_range(min_len..=max_len);
            let postings = (0..len)
                .map(|i| {
                    GroupWeight::new(
                        format!("t{term_idx}g{i}"),
                        rng.random_range(0.01..10.0),
                    )
                })
                .collect();
            PostingEntry::new(format!("term{term_idx}"), postings)
        })
        .collect()
}

/// Generate a join workload over `groups` groups, with up to
/// `max_payloads_per_group` metadata records each. Groups hit by
/// `missing_assignment_probability` get payloads but no assignment.
pub fn generate_join_dataset(
    groups: usize,
    max_payloads_per_group: usize,
    missing_assignment_probability: f64,
    seed: u64,
) -> JoinDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut assignments = Vec::new();
    let mut payloads = Vec::new();

    for group_idx in 0..groups {
        let group_id = format!("{group_idx}");
        if rng.random_bool(1.0 - missing_assignment_probability) {
            assignments.push(AssignmentRecord::new(
                group_id.clone(),
                ClusterId(rng.random_range(0..1000)),
            ));
        }
        let payload_count = rng.random_range(1..=max_payloads_per_group);
        for entry_idx in 0..payload_count {
            payloads.push(PayloadRecord::new(
                group_id.clone(),
                format!("e{group_idx}_{entry_idx}@@{group_id}"),
                vec![format!("name-{entry_idx}"), format!("model-{entry_idx}")],
            ));
        }
    }

    JoinDataset {
        assignments,
        payloads,
    }
}

use linkback_rs::config::JoinConfig;
use linkback_rs::join::JoinValue;
use linkback_rs::model::{AssignmentRecord, ClusterId, PayloadRecord};
use linkback_rs::pipeline::LinkBackJob;
use linkback_rs::test_support::generate_join_dataset;
use std::collections::{HashMap, HashSet};

#[test]
fn every_assigned_payload_is_joined() -> anyhow::Result<()> {
    let dataset = generate_join_dataset(200, 8, 0.0, 42);
    let job = LinkBackJob::new(JoinConfig { shard_count: 6 })?;
    let (joined, stats) = job.run(&dataset.assignments, &dataset.payloads)?;

    assert_eq!(joined.len(), dataset.payloads.len());
    assert_eq!(stats.emitted, dataset.payloads.len() as u64);
    assert_eq!(stats.unassigned_dropped, 0);
    assert_eq!(stats.malformed, 0);

    // Each joined record carries its group's cluster.
    let clusters: HashMap<&str, ClusterId> = dataset
        .assignments
        .iter()
        .map(|a| (a.group_id.as_str(), a.cluster_id))
        .collect();
    let entry_to_group: HashMap<String, &str> = dataset
        .payloads
        .iter()
        .map(|p| (p.entry.clone(), p.group_id.as_str()))
        .collect();
    for record in &joined {
        let group = entry_to_group[&record.text];
        assert_eq!(record.cluster_id, clusters[group]);
    }
    Ok(())
}

#[test]
fn unassigned_groups_are_dropped_and_counted() -> anyhow::Result<()> {
    let dataset = generate_join_dataset(300, 5, 0.3, 7);
    let job = LinkBackJob::new(JoinConfig { shard_count: 4 })?;
    let (joined, stats) = job.run(&dataset.assignments, &dataset.payloads)?;

    let assigned: HashSet<&str> = dataset
        .assignments
        .iter()
        .map(|a| a.group_id.as_str())
        .collect();
    let expected_joined = dataset
        .payloads
        .iter()
        .filter(|p| assigned.contains(p.group_id.as_str()))
        .count();
    let expected_dropped = dataset.payloads.len() - expected_joined;

    assert_eq!(joined.len(), expected_joined);
    assert_eq!(stats.emitted, expected_joined as u64);
    assert_eq!(stats.unassigned_dropped, expected_dropped as u64);
    Ok(())
}

#[test]
fn group_42_scenario() -> anyhow::Result<()> {
    // The canonical case: one assignment, two payloads, surrounded by
    // unrelated groups on other shards.
    let mut assignments = vec![AssignmentRecord::new("42", ClusterId(3))];
    let mut payloads = vec![
        PayloadRecord::new("42", "101@@42", vec!["Widget".to_string()]),
        PayloadRecord::new("42", "102@@42", vec!["Gadget".to_string()]),
    ];
    for i in 0..50u32 {
        assignments.push(AssignmentRecord::new(format!("other{i}"), ClusterId(100 + i)));
        payloads.push(PayloadRecord::new(
            format!("other{i}"),
            format!("x{i}@@other{i}"),
            vec![],
        ));
    }

    let job = LinkBackJob::new(JoinConfig { shard_count: 8 })?;
    let (joined, _) = job.run(&assignments, &payloads)?;

    let group_42: HashSet<(u32, &str)> = joined
        .iter()
        .filter(|record| record.text.ends_with("@@42"))
        .map(|record| (record.cluster_id.0, record.text.as_str()))
        .collect();
    assert_eq!(
        group_42,
        HashSet::from([(3, "101@@42"), (3, "102@@42")])
    );
    Ok(())
}

#[test]
fn malformed_wire_values_skip_single_records() -> anyhow::Result<()> {
    let values = vec![
        ("g1".to_string(), JoinValue::Assignment("7".to_string())),
        ("g1".to_string(), JoinValue::Payload("e1@@g1::m".to_string())),
        ("g2".to_string(), JoinValue::Assignment("oops".to_string())),
        ("g2".to_string(), JoinValue::Payload("e2@@g2".to_string())),
    ];

    let job = LinkBackJob::new(JoinConfig { shard_count: 3 })?;
    let (joined, stats) = job.run_values(values)?;

    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].cluster_id, ClusterId(7));
    assert_eq!(joined[0].text, "e1@@g1");
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.unassigned_dropped, 1);
    Ok(())
}

#[test]
fn rerun_reproduces_identical_output() -> anyhow::Result<()> {
    let dataset = generate_join_dataset(500, 6, 0.1, 99);
    let job = LinkBackJob::new(JoinConfig { shard_count: 7 })?;

    let first = job.run(&dataset.assignments, &dataset.payloads)?;
    let second = job.run(&dataset.assignments, &dataset.payloads)?;
    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
    Ok(())
}

#[test]
fn single_shard_and_many_shards_agree_on_content() -> anyhow::Result<()> {
    let dataset = generate_join_dataset(100, 4, 0.2, 3);
    let narrow = LinkBackJob::new(JoinConfig { shard_count: 1 })?;
    let wide = LinkBackJob::new(JoinConfig { shard_count: 16 })?;

    let (narrow_out, narrow_stats) = narrow.run(&dataset.assignments, &dataset.payloads)?;
    let (wide_out, wide_stats) = wide.run(&dataset.assignments, &dataset.payloads)?;

    let as_set = |records: &[linkback_rs::model::JoinedOutput]| {
        records
            .iter()
            .map(|r| (r.cluster_id, r.text.clone()))
            .collect::<HashSet<_>>()
    };
    assert_eq!(as_set(&narrow_out), as_set(&wide_out));
    assert_eq!(narrow_stats, wide_stats);
    Ok(())
}

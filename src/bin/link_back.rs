use std::fs;
use std::io::Write;

use linkback_rs::config::{ConfigOverrides, LinkbackConfig};
use linkback_rs::join::JoinValue;
use linkback_rs::pipeline::LinkBackJob;
use tracing::warn;

fn parse_arg(flag: &str) -> Option<String> {
    let mut args = std::env::args();
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

/// Read `group \t value` lines into tagged join values. Lines without the
/// group delimiter cannot be keyed at all and are skipped here; value-level
/// parse failures are left to the reducer's counters.
fn load_values(
    path: &str,
    tag: fn(String) -> JoinValue,
    values: &mut Vec<(String, JoinValue)>,
) -> anyhow::Result<()> {
    let raw = fs::read_to_string(path)?;
    for (line_no, line) in raw.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        match line.split_once('\t') {
            Some((group_id, value)) => {
                values.push((group_id.to_string(), tag(value.to_string())));
            }
            None => warn!(path, line = line_no + 1, "skipping line without group key"),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let assignments =
        parse_arg("--assignments").ok_or_else(|| anyhow::anyhow!("--assignments is required"))?;
    let payloads =
        parse_arg("--payloads").ok_or_else(|| anyhow::anyhow!("--payloads is required"))?;
    let output = parse_arg("--output").unwrap_or_else(|| "joined.tsv".to_string());
    let config_path = parse_arg("--config");

    let mut overrides = ConfigOverrides::default();
    if let Some(value) = parse_arg("--shards") {
        overrides.join.shard_count = Some(value.parse()?);
    }
    let config = LinkbackConfig::load(config_path.as_deref(), overrides)?;

    let mut values = Vec::new();
    load_values(&assignments, JoinValue::Assignment, &mut values)?;
    load_values(&payloads, JoinValue::Payload, &mut values)?;

    let job = LinkBackJob::new(config.join)?;
    let (joined, stats) = job.run_values(values)?;

    let mut out = fs::File::create(&output)?;
    for record in &joined {
        writeln!(out, "{record}")?;
    }
    if let Some(stats_path) = parse_arg("--stats") {
        fs::write(&stats_path, serde_json::to_string_pretty(&stats)?)?;
    }
    println!(
        "{} joined records written to {} ({} malformed, {} unassigned dropped)",
        stats.emitted, output, stats.malformed, stats.unassigned_dropped
    );

    Ok(())
}

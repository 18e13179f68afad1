use std::fs;
use std::io::Write;

use linkback_rs::config::{ConfigOverrides, LinkbackConfig};
use linkback_rs::model::PostingEntry;
use linkback_rs::pipeline::{SplitJob, TaskBatch};
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

/// Read `term \t group=weight,...` lines into posting entries.
fn load_postings(path: &str) -> anyhow::Result<Vec<PostingEntry>> {
    let raw = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let Some((term, list)) = line.split_once('\t') else {
            warn!(line = line_no + 1, "skipping line without term delimiter");
            continue;
        };
        let (postings, malformed) = PostingEntry::parse_list(list);
        if malformed > 0 {
            warn!(line = line_no + 1, malformed, "dropped malformed postings");
        }
        entries.push(PostingEntry::new(term, postings));
    }
    Ok(entries)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let input = parse_arg("--input").ok_or_else(|| anyhow::anyhow!("--input is required"))?;
    let output = parse_arg("--output").unwrap_or_else(|| "work_units.tsv".to_string());
    let tasks: u16 = parse_arg("--tasks").unwrap_or_else(|| "1".to_string()).parse()?;
    let config_path = parse_arg("--config");

    let mut overrides = ConfigOverrides::default();
    if let Some(value) = parse_arg("--split-count") {
        overrides.split.split_count = Some(value.parse()?);
    }
    if let Some(value) = parse_arg("--length-threshold") {
        overrides.split.length_threshold = Some(value.parse()?);
    }
    let config = LinkbackConfig::load(config_path.as_deref(), overrides)?;

    let entries = load_postings(&input)?;
    let tasks = tasks.max(1);
    let chunk = entries.len().div_ceil(tasks as usize).max(1);
    let batches = entries
        .chunks(chunk)
        .enumerate()
        .map(|(idx, entries)| TaskBatch::new(idx as u16, entries.to_vec()))
        .collect::<Vec<_>>();

    let job = SplitJob::new(config.split)?;
    let emissions = job.run(batches)?;

    let mut out = fs::File::create(&output)?;
    for (key, unit) in &emissions {
        writeln!(out, "{},{}\t{}", key.primary, key.tag, unit.to_wire())?;
    }
    println!("{} work units written to {}", emissions.len(), output);

    Ok(())
}

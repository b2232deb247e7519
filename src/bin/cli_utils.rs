use anyhow::{Context, Result};
use ipcountry::{DatasetLoader, LoadOutcome, RangeIndex};
use log::LevelFilter;
use std::path::Path;

/// Set up env_logger: `RUST_LOG` is honoured, `-v` flags raise the level
pub fn init_logger(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbosity > 0 || std::env::var_os("RUST_LOG").is_none() {
        let level = match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        builder.filter_level(level);
        builder.filter_module("reqwest", LevelFilter::Warn.min(level));
        builder.filter_module("hyper", LevelFilter::Warn.min(level));
    }
    builder.format_timestamp(None).init();
}

/// Load a local dataset and build the index
pub fn load_index_from_path(path: &Path) -> Result<(RangeIndex, LoadOutcome)> {
    let mut outcome = DatasetLoader::new()
        .load_path(path)
        .with_context(|| format!("Failed to load dataset: {}", path.display()))?;
    let index = build_index(&mut outcome)?;
    Ok((index, outcome))
}

/// Move the loaded records into a new index; `outcome.records` is left empty
///
/// A dataset without a single usable row is an error, not an empty index:
/// every lookup against it would report "not found".
pub fn build_index(outcome: &mut LoadOutcome) -> Result<RangeIndex> {
    if outcome.rows_read == 0 {
        anyhow::bail!("Dataset contains no rows");
    }
    if outcome.records.is_empty() {
        anyhow::bail!(
            "None of the {} dataset rows could be parsed",
            format_number(outcome.rows_read)
        );
    }
    let records = std::mem::take(&mut outcome.records);
    RangeIndex::from_records(records).context("Dataset is structurally invalid")
}

pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

pub fn format_qps(qps: f64) -> String {
    if qps >= 1_000_000.0 {
        format!("{:.2}M", qps / 1_000_000.0)
    } else if qps >= 1_000.0 {
        format!("{:.2}K", qps / 1_000.0)
    } else {
        format!("{:.2}", qps)
    }
}

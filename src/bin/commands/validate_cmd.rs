use anyhow::{Context, Result};
use ipcountry::{DatasetLoader, IndexError, RangeIndex};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use crate::cli_utils::format_number;

/// Skipped rows listed without --verbose
const SKIPPED_PREVIEW: usize = 10;

pub fn cmd_validate(
    dataset: PathBuf,
    max_skip_rate: Option<f64>,
    json_output: bool,
    verbose: bool,
) -> Result<ExitCode> {
    if let Some(rate) = max_skip_rate {
        if !(0.0..=1.0).contains(&rate) {
            anyhow::bail!("Max skip rate must be between 0.0 and 1.0, got {}", rate);
        }
    }

    let start = Instant::now();
    let mut outcome = DatasetLoader::new()
        .load_path(&dataset)
        .with_context(|| format!("Failed to load dataset: {}", dataset.display()))?;
    let load_time = start.elapsed();

    let mut errors = Vec::new();
    if let Some(limit) = max_skip_rate {
        if let Err(e) = outcome.check_skip_rate(limit) {
            errors.push(e.to_string());
        }
    }

    let record_count = outcome.records.len();
    if record_count == 0 {
        errors.push(format!(
            "no usable rows ({} read)",
            format_number(outcome.rows_read)
        ));
    }
    let build_start = Instant::now();
    let stats = match RangeIndex::from_records(std::mem::take(&mut outcome.records)) {
        Ok(index) => Some(index.stats()?),
        Err(e @ IndexError::OverlappingRange { .. }) => {
            errors.push(e.to_string());
            None
        }
        Err(e) => return Err(e).context("Failed to build index"),
    };
    let build_time = build_start.elapsed();
    let is_valid = errors.is_empty();

    if json_output {
        let skipped: Vec<_> = outcome
            .skipped
            .iter()
            .map(|row| json!({ "line": row.line, "error": row.error.to_string() }))
            .collect();
        let output = json!({
            "dataset": dataset.display().to_string(),
            "is_valid": is_valid,
            "rows_read": outcome.rows_read,
            "records": record_count,
            "skipped": skipped,
            "skip_rate": outcome.skip_rate(),
            "errors": errors,
            "stats": stats,
            "load_ms": load_time.as_millis(),
            "build_ms": build_time.as_millis(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Validating: {}", dataset.display());
        println!();

        println!("Statistics:");
        println!("  Rows read:   {}", format_number(outcome.rows_read));
        println!("  Valid rows:  {}", format_number(record_count));
        println!(
            "  Skipped:     {} ({:.2}%)",
            format_number(outcome.skipped.len()),
            outcome.skip_rate() * 100.0
        );
        if let Some(stats) = &stats {
            println!("  Index:       {}", stats.summary());
        }
        println!(
            "  Load time:   {:.2}ms, build time: {:.2}ms",
            load_time.as_secs_f64() * 1000.0,
            build_time.as_secs_f64() * 1000.0
        );
        println!();

        if !outcome.skipped.is_empty() {
            let shown = if verbose {
                outcome.skipped.len()
            } else {
                SKIPPED_PREVIEW.min(outcome.skipped.len())
            };
            println!("SKIPPED ROWS ({}):", outcome.skipped.len());
            for row in outcome.skipped.iter().take(shown) {
                println!("  • line {}: {}", row.line, row.error);
            }
            if shown < outcome.skipped.len() {
                println!(
                    "  ... {} more (use --verbose to show all)",
                    outcome.skipped.len() - shown
                );
            }
            println!();
        }

        if !errors.is_empty() {
            println!("ERRORS ({}):", errors.len());
            for error in &errors {
                println!("  • {}", error);
            }
            println!();
        }

        if is_valid {
            println!("✓ VALIDATION PASSED");
        } else {
            println!("✗ VALIDATION FAILED");
        }
    }

    Ok(if is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

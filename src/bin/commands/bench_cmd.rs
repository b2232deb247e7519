use anyhow::{Context, Result};
use ipcountry::{synthetic, RangeIndex};
use std::process::ExitCode;
use std::time::Instant;

use crate::cli_utils::{format_number, format_qps};

pub fn cmd_bench(sizes: Vec<usize>, occupancy: f64, query_count: usize) -> Result<ExitCode> {
    if !(0.0..=1.0).contains(&occupancy) {
        anyhow::bail!("Occupancy must be between 0.0 and 1.0, got {}", occupancy);
    }

    println!("=== ipcountry Lookup Benchmark ===\n");
    println!("Configuration:");
    let size_list: Vec<String> = sizes.iter().map(|s| format_number(*s)).collect();
    println!("  Dataset sizes:  {}", size_list.join(", "));
    println!("  Occupancy:      {:.0}% of IPv4 space", occupancy * 100.0);
    println!("  Queries:        {}", format_number(query_count));
    println!();

    let queries = synthetic::ipv4_queries(query_count);

    for &size in &sizes {
        println!("--- {} ranges ---", format_number(size));

        let records = synthetic::ipv4_intervals(size, occupancy);
        let build_start = Instant::now();
        let index = RangeIndex::from_records(records).context("Failed to build synthetic index")?;
        let build_time = build_start.elapsed();

        let steps = synthetic::average_steps(&index, &queries);

        let query_start = Instant::now();
        let mut found = 0usize;
        for addr in &queries {
            if index.resolve(addr)?.is_found() {
                found += 1;
            }
        }
        let query_time = query_start.elapsed();
        let qps = query_count as f64 / query_time.as_secs_f64().max(f64::EPSILON);

        println!("  Build time:  {:.2}ms", build_time.as_secs_f64() * 1000.0);
        println!(
            "  Avg steps:   {:.2} (log2 n = {:.2})",
            steps,
            (size.max(1) as f64).log2()
        );
        println!("  QPS:         {} queries/sec", format_qps(qps));
        println!(
            "  Found:       {}/{}",
            format_number(found),
            format_number(query_count)
        );
        println!();
    }

    println!("✓ Benchmark complete");
    Ok(ExitCode::SUCCESS)
}

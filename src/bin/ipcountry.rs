mod cli_utils;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use commands::{cmd_bench, cmd_lookup, cmd_validate, LookupArgs};

#[derive(Parser)]
#[command(name = "ipcountry")]
#[command(
    about = "Resolve IP addresses to country codes from IP range datasets",
    long_about = "ipcountry - Resolve IPv4/IPv6 addresses to country codes\n\n\
    Loads a dataset of disjoint 'start,end,country' ranges (the free db-ip \n\
    country lite dump by default), builds a sorted index once and answers \n\
    lookups with a binary search.\n\n\
    Exit status:\n\
      0  every address was resolved\n\
      1  an address was not found or is not a valid IP\n\
      2  the dataset could not be obtained or is invalid\n\n\
    Examples:\n\
      ipcountry lookup 8.8.8.8\n\
      ipcountry lookup --dataset dbip-country-lite-2024-01.csv.gz 1.1.1.1 2606:4700::1111\n\
      ipcountry validate dbip-country-lite-2024-01.csv.gz --verbose\n\
      ipcountry bench --sizes 100,100000"
)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG also works
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the country of one or more IP addresses
    Lookup {
        /// IPv4 or IPv6 addresses to resolve
        #[arg(value_name = "IP", required = true)]
        addresses: Vec<String>,

        /// Local dataset file (.csv or .csv.gz), or "-" for stdin
        #[arg(short, long, value_name = "FILE", env = "IPCOUNTRY_DATASET")]
        dataset: Option<PathBuf>,

        /// Dataset URL, ignored when --dataset is given
        /// (default: db-ip country lite for the current or previous month)
        #[arg(long, value_name = "URL", env = "IPCOUNTRY_URL")]
        url: Option<String>,

        /// Directory for the downloaded dataset
        #[arg(long, value_name = "DIR", env = "IPCOUNTRY_CACHE_DIR")]
        cache_dir: Option<PathBuf>,

        /// Re-download once the cached copy is older than this many hours
        /// (default: keep the cached copy forever)
        #[arg(long, value_name = "HOURS")]
        max_age_hours: Option<u64>,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,

        /// Quiet mode - no output, only exit code (0 = all found, 1 = not found)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Validate a dataset file: parse every row and check ranges for overlap
    Validate {
        /// Dataset file (.csv or .csv.gz), or "-" for stdin
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Fail when more than this share of rows is skipped (0.0 - 1.0)
        #[arg(long, value_name = "RATIO")]
        max_skip_rate: Option<f64>,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Benchmark lookups against synthetic datasets of different sizes
    Bench {
        /// Dataset sizes to compare (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "100,100000")]
        sizes: Vec<usize>,

        /// Share of the IPv4 space covered by ranges (0.0 - 1.0)
        #[arg(long, default_value = "0.5")]
        occupancy: f64,

        /// Number of queries per dataset
        #[arg(long, default_value = "100000")]
        queries: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli_utils::init_logger(cli.verbose);

    let verbose = cli.verbose > 0;
    let result = match cli.command {
        Commands::Lookup {
            addresses,
            dataset,
            url,
            cache_dir,
            max_age_hours,
            json,
            quiet,
        } => cmd_lookup(LookupArgs {
            addresses,
            dataset,
            url,
            cache_dir,
            max_age_hours,
            json,
            quiet,
        }),
        Commands::Validate {
            dataset,
            max_skip_rate,
            json,
        } => cmd_validate(dataset, max_skip_rate, json, verbose),
        Commands::Bench {
            sizes,
            occupancy,
            queries,
        } => cmd_bench(sizes, occupancy, queries),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

use anyhow::{Context, Result};
use ipcountry::source::{cache_file_name, default_cache_dir, recent_dataset_urls};
use ipcountry::{
    CachedSource, DatasetLoader, DatasetSource, HttpSource, IndexError, Lookup, RangeIndex,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::cli_utils::{build_index, load_index_from_path};

/// Printed when no range contains the address
const UNKNOWN_COUNTRY: &str = "Unknown Country";

pub struct LookupArgs {
    pub addresses: Vec<String>,
    pub dataset: Option<PathBuf>,
    pub url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub max_age_hours: Option<u64>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct LookupResult<'a> {
    ip: &'a str,
    country: Option<&'a str>,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn cmd_lookup(args: LookupArgs) -> Result<ExitCode> {
    let index = match &args.dataset {
        Some(path) => load_index_from_path(path)?.0,
        None => load_index_from_remote(&args)?,
    };

    let mut results = Vec::with_capacity(args.addresses.len());
    for text in &args.addresses {
        let result = match index.resolve_str(text) {
            Ok(Lookup::Found(country)) => LookupResult {
                ip: text,
                country: Some(country),
                found: true,
                error: None,
            },
            Ok(Lookup::NotFound) => LookupResult {
                ip: text,
                country: None,
                found: false,
                error: None,
            },
            Err(e @ IndexError::InvalidAddress(_)) => LookupResult {
                ip: text,
                country: None,
                found: false,
                error: Some(e.to_string()),
            },
            Err(e) => return Err(e).context("Lookup failed"),
        };
        results.push(result);
    }

    let all_found = results.iter().all(|r| r.found);

    if !args.quiet {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else {
            for result in &results {
                match (&result.error, result.country) {
                    (Some(error), _) => eprintln!("{}", error),
                    (None, country) => println!(
                        "The country for IP address '{}': {}",
                        result.ip,
                        country.unwrap_or(UNKNOWN_COUNTRY)
                    ),
                }
            }
        }
    }

    Ok(if all_found {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn load_index_from_remote(args: &LookupArgs) -> Result<RangeIndex> {
    let cache_dir = args.cache_dir.clone().unwrap_or_else(default_cache_dir);
    let max_age = args
        .max_age_hours
        .map(|h| Duration::from_secs(h.saturating_mul(3600)));

    let urls = match &args.url {
        Some(url) => vec![url.clone()],
        None => recent_dataset_urls(),
    };

    let sources: Vec<_> = urls
        .iter()
        .map(|url| {
            CachedSource::new(HttpSource::new(url.as_str()), &cache_dir, &cache_file_name(url))
                .with_max_age(max_age)
        })
        .collect();
    load_first_usable(&sources)
}

/// Build the index from the first source that yields a usable dataset
///
/// Sources are tried in order (newest dump first). A dataset that cannot
/// be parsed or built has its cached copy dropped before moving on.
fn load_first_usable<S: DatasetSource>(sources: &[CachedSource<S>]) -> Result<RangeIndex> {
    let mut last_error = None;
    for source in sources {
        match load_from_source(source) {
            Ok(index) => return Ok(index),
            Err(e) => {
                log::warn!("Could not use {}: {:#}", source.describe(), e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(e.context("Failed to obtain dataset")),
        None => anyhow::bail!("No dataset URL to fetch"),
    }
}

/// Fetch and build; an unusable copy is invalidated and fetched once more
fn load_from_source<S: DatasetSource>(source: &CachedSource<S>) -> Result<RangeIndex> {
    let bytes = source.fetch()?;
    let first_error = match index_from_bytes(&bytes) {
        Ok(index) => return Ok(index),
        Err(e) => e,
    };

    log::warn!(
        "Dataset at {} is unusable ({:#}); discarding it and refetching",
        source.cache_path().display(),
        first_error
    );
    source.invalidate()?;

    let bytes = source.fetch().context(first_error.to_string())?;
    index_from_bytes(&bytes).inspect_err(|_| {
        if let Err(e) = source.invalidate() {
            log::warn!("Could not discard cached dataset: {}", e);
        }
    })
}

fn index_from_bytes(bytes: &[u8]) -> Result<RangeIndex> {
    let mut outcome = DatasetLoader::new()
        .load_bytes(bytes)
        .context("Failed to parse dataset")?;
    build_index(&mut outcome)
}

//! Dataset loading from CSV range dumps
//!
//! Reads rows of `start,end,label` (db-ip "country lite" layout: no header,
//! one range per line) and turns them into validated [`IntervalRecord`]s.
//! Bad rows are collected and skipped instead of aborting the load.
//!
//! # Example
//!
//! ```rust,no_run
//! use ipcountry::DatasetLoader;
//!
//! // .gz files are decompressed automatically
//! let outcome = DatasetLoader::new().load_path("dbip-country-lite-2024-01.csv.gz")?;
//! println!("{} ranges, {} skipped", outcome.records.len(), outcome.skipped.len());
//! # Ok::<(), ipcountry::LoadError>(())
//! ```

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{stdin, BufReader, Read};
use std::path::Path;

use crate::error::{LoadError, RowError};
use crate::record::IntervalRecord;

/// Buffer size for file reading
const BUFFER_SIZE: usize = 128 * 1024;

/// Skipped rows logged individually at debug level
const DETAILED_SKIP_LOG_LIMIT: usize = 5;

/// Gzip stream magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A rejected row and where it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the source
    pub line: u64,
    /// Why the row was rejected
    pub error: RowError,
}

/// Result of a full pass over a dataset
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    /// Valid records in source order
    pub records: Vec<IntervalRecord>,
    /// Rejected rows in source order
    pub skipped: Vec<SkippedRow>,
    /// Data rows seen (valid + skipped)
    pub rows_read: usize,
}

impl LoadOutcome {
    /// Fraction of rows skipped, 0.0 for an empty source
    pub fn skip_rate(&self) -> f64 {
        if self.rows_read == 0 {
            0.0
        } else {
            self.skipped.len() as f64 / self.rows_read as f64
        }
    }

    /// Fail if more than `max_ratio` (0.0..=1.0) of the rows were skipped
    pub fn check_skip_rate(&self, max_ratio: f64) -> Result<(), LoadError> {
        if self.skip_rate() > max_ratio {
            return Err(LoadError::TooManySkipped {
                skipped: self.skipped.len(),
                rows: self.rows_read,
                limit: max_ratio * 100.0,
            });
        }
        Ok(())
    }
}

/// CSV range dataset reader
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    comments: bool,
    max_rows: Option<usize>,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLoader {
    /// Loader with `#` comments enabled and no row limit
    pub fn new() -> Self {
        Self {
            comments: true,
            max_rows: None,
        }
    }

    /// Treat lines starting with `#` as comments
    pub fn comments(mut self, enabled: bool) -> Self {
        self.comments = enabled;
        self
    }

    /// Stop after this many data rows
    pub fn max_rows(mut self, limit: Option<usize>) -> Self {
        self.max_rows = limit;
        self
    }

    /// Open a dataset file, decompressing `.gz` files; `-` reads stdin
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<LoadOutcome, LoadError> {
        let path = path.as_ref();

        if path.to_str() == Some("-") {
            return self.load_reader(BufReader::with_capacity(BUFFER_SIZE, stdin()));
        }

        let file = File::open(path).map_err(|e| {
            LoadError::SourceUnavailable(format!("failed to open {}: {}", path.display(), e))
        })?;

        let is_gzip = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        log::info!("Loading dataset from {}", path.display());
        if is_gzip {
            let decoder = GzDecoder::new(BufReader::with_capacity(BUFFER_SIZE, file));
            self.load_reader(decoder)
        } else {
            self.load_reader(BufReader::with_capacity(BUFFER_SIZE, file))
        }
    }

    /// Load from an in-memory buffer, gunzipping when it starts with the gzip magic
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<LoadOutcome, LoadError> {
        if bytes.starts_with(&GZIP_MAGIC) {
            self.load_reader(GzDecoder::new(bytes))
        } else {
            self.load_reader(bytes)
        }
    }

    /// Parse every row of `source`
    ///
    /// Only I/O failures (including a corrupt gzip stream) are fatal; row
    /// problems end up in [`LoadOutcome::skipped`].
    pub fn load_reader<R: Read>(&self, source: R) -> Result<LoadOutcome, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(if self.comments { Some(b'#') } else { None })
            .buffer_capacity(BUFFER_SIZE)
            .from_reader(source);

        let mut outcome = LoadOutcome::default();
        let mut row = csv::ByteRecord::new();

        loop {
            if self.max_rows.is_some_and(|limit| outcome.rows_read >= limit) {
                log::debug!("Row limit reached after {} rows", outcome.rows_read);
                break;
            }

            let more = reader
                .read_byte_record(&mut row)
                .map_err(csv_to_load_error)?;
            if !more {
                break;
            }

            outcome.rows_read += 1;
            let line = row
                .position()
                .map(|p| p.line())
                .unwrap_or(outcome.rows_read as u64);

            match parse_row(&row) {
                Ok(record) => outcome.records.push(record),
                Err(error) => outcome.skipped.push(SkippedRow { line, error }),
            }
        }

        report_skipped(&outcome);
        Ok(outcome)
    }
}

fn parse_row(row: &csv::ByteRecord) -> Result<IntervalRecord, RowError> {
    if row.len() != 3 {
        return Err(RowError::malformed(format!(
            "expected 3 fields, found {}",
            row.len()
        )));
    }

    let field = |i: usize| {
        std::str::from_utf8(&row[i])
            .map_err(|_| RowError::malformed(format!("field {} is not valid UTF-8", i + 1)))
    };

    IntervalRecord::parse(field(0)?, field(1)?, field(2)?)
}

fn csv_to_load_error(err: csv::Error) -> LoadError {
    match err.into_kind() {
        csv::ErrorKind::Io(e) => LoadError::SourceUnavailable(format!("read failed: {}", e)),
        other => LoadError::SourceUnavailable(format!("{:?}", other)),
    }
}

fn report_skipped(outcome: &LoadOutcome) {
    if outcome.skipped.is_empty() {
        log::debug!("Loaded {} ranges", outcome.records.len());
        return;
    }

    log::warn!(
        "Skipped {} of {} rows ({:.2}%)",
        outcome.skipped.len(),
        outcome.rows_read,
        outcome.skip_rate() * 100.0
    );
    for row in outcome.skipped.iter().take(DETAILED_SKIP_LOG_LIMIT) {
        log::debug!("  line {}: {}", row.line, row.error);
    }
}

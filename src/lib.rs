//! ipcountry - IP Address to Country Resolution
//!
//! Resolves IPv4 and IPv6 addresses to country codes using a table of
//! disjoint `start,end,country` ranges such as the free db-ip
//! "country lite" dump.
//!
//! # Quick Start
//!
//! ```rust
//! use ipcountry::{DatasetLoader, Lookup, RangeIndex};
//!
//! let csv = "0.0.0.0,0.255.255.255,AA\n1.0.0.0,1.255.255.255,BB\n10.0.0.5,10.0.0.1,XX\n";
//!
//! // Parse rows; bad rows are skipped and reported, not fatal
//! let outcome = DatasetLoader::new().load_bytes(csv.as_bytes())?;
//! assert_eq!(outcome.skipped.len(), 1);
//!
//! // Sort + overlap check once, then query as often as needed
//! let index = RangeIndex::from_records(outcome.records)?;
//! assert_eq!(index.resolve_str("0.10.0.1")?, Lookup::Found("AA"));
//! assert_eq!(index.resolve_str("1.0.0.0")?, Lookup::Found("BB"));
//! assert_eq!(index.resolve_str("2.0.0.0")?, Lookup::NotFound);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   bytes   ┌────────────────┐  records  ┌──────────────┐
//! │  DatasetSource   │ ────────▶ │ DatasetLoader  │ ────────▶ │  RangeIndex  │
//! │ (HTTP + cache)   │           │ (CSV, gzip)    │           │ (v4 | v6)    │
//! └──────────────────┘           └────────────────┘           └──────────────┘
//!                                                        resolve(ip): O(log n)
//! ```
//!
//! IPv4 and IPv6 ranges are kept in separate sorted partitions so a query
//! is only ever compared against ranges of its own family.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Family-tagged integer addresses
pub mod address;
/// Error types
pub mod error;
pub mod index;
pub mod loader;
/// Inclusive address ranges
pub mod record;
pub mod source;
pub mod synthetic;

pub use crate::address::{Address, IpFamily};
pub use crate::error::{IndexError, LoadError, RowError, SourceError};
pub use crate::index::{IndexStats, Lookup, Probe, RangeIndex};
pub use crate::loader::{DatasetLoader, LoadOutcome, SkippedRow};
pub use crate::record::IntervalRecord;
pub use crate::source::{CachedSource, DatasetSource};

#[cfg(feature = "remote")]
pub use crate::source::HttpSource;

/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

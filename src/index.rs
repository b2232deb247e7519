//! Sorted interval index with binary search containment queries
//!
//! Intervals are split per address family, sorted by start and checked for
//! overlap once at build time. After that the index is immutable, so a
//! built [`RangeIndex`] can be shared between threads (e.g. behind an
//! `Arc`) and queried without locking.
//!
//! ```
//! use ipcountry::{IntervalRecord, Lookup, RangeIndex};
//!
//! let records = vec![
//!     IntervalRecord::parse("1.0.0.0", "1.255.255.255", "BB")?,
//!     IntervalRecord::parse("0.0.0.0", "0.255.255.255", "AA")?,
//! ];
//! let index = RangeIndex::from_records(records)?;
//!
//! assert_eq!(index.resolve_str("0.10.0.1")?, Lookup::Found("AA"));
//! assert_eq!(index.resolve_str("2.0.0.0")?, Lookup::NotFound);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::address::{Address, IpFamily};
use crate::error::{IndexError, Result};
use crate::record::IntervalRecord;

/// Partitions larger than this are sorted with rayon
const PARALLEL_SORT_THRESHOLD: usize = 10_000;

/// Outcome of a containment query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Label of the interval containing the address
    Found(&'a str),
    /// No interval contains the address
    NotFound,
}

impl<'a> Lookup<'a> {
    /// The label, if found
    pub fn label(&self) -> Option<&'a str> {
        match self {
            Lookup::Found(label) => Some(label),
            Lookup::NotFound => None,
        }
    }

    /// True when an interval matched
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Search result with the number of comparisons the binary search made
#[derive(Debug, Clone, Copy)]
pub struct Probe<'a> {
    /// Interval containing the address, if any
    pub record: Option<&'a IntervalRecord>,
    /// Comparison steps taken
    pub steps: u32,
}

impl<'a> Probe<'a> {
    /// Collapse into a plain [`Lookup`]
    pub fn lookup(&self) -> Lookup<'a> {
        match self.record {
            Some(rec) => Lookup::Found(rec.label()),
            None => Lookup::NotFound,
        }
    }
}

/// Summary of a built index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// IPv4 intervals
    pub v4_intervals: usize,
    /// IPv6 intervals
    pub v6_intervals: usize,
    /// Distinct labels across both families
    pub labels: usize,
    /// IPv4 addresses covered by some interval
    pub v4_addresses_covered: u64,
}

impl IndexStats {
    /// One-line description
    pub fn summary(&self) -> String {
        let v4_share = self.v4_addresses_covered as f64 / (u32::MAX as f64 + 1.0) * 100.0;
        format!(
            "{} IPv4 + {} IPv6 intervals, {} labels, {:.2}% of IPv4 space covered",
            self.v4_intervals, self.v6_intervals, self.labels, v4_share
        )
    }
}

#[derive(Debug)]
enum State {
    Unbuilt,
    Built {
        v4: Vec<IntervalRecord>,
        v6: Vec<IntervalRecord>,
    },
}

/// Immutable, family-partitioned interval index
///
/// Starts out unbuilt; [`build`](Self::build) moves it to the built state
/// exactly once. Rebuilding from new data requires a fresh instance.
#[derive(Debug)]
pub struct RangeIndex {
    state: State,
}

impl Default for RangeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeIndex {
    /// Create an unbuilt index
    pub fn new() -> Self {
        Self {
            state: State::Unbuilt,
        }
    }

    /// Create and build in one step
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = IntervalRecord>,
    {
        let mut index = Self::new();
        index.build(records)?;
        Ok(index)
    }

    /// Sort, validate and freeze the given intervals
    ///
    /// Fails with [`IndexError::OverlappingRange`] if two intervals of the same
    /// family share an address; the index then stays unbuilt.
    pub fn build<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = IntervalRecord>,
    {
        if self.is_built() {
            return Err(IndexError::AlreadyBuilt);
        }

        let (mut v4, mut v6): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|rec| rec.family() == IpFamily::V4);

        sort_partition(&mut v4);
        check_disjoint(&v4)?;
        sort_partition(&mut v6);
        check_disjoint(&v6)?;

        log::debug!(
            "Built range index: {} IPv4 and {} IPv6 intervals",
            v4.len(),
            v6.len()
        );

        self.state = State::Built { v4, v6 };
        Ok(())
    }

    /// Whether [`build`](Self::build) has completed
    pub fn is_built(&self) -> bool {
        matches!(self.state, State::Built { .. })
    }

    /// Find the label of the interval containing `addr`
    pub fn resolve(&self, addr: &Address) -> Result<Lookup<'_>> {
        Ok(self.locate(addr)?.lookup())
    }

    /// Parse `text` and resolve it
    pub fn resolve_str(&self, text: &str) -> Result<Lookup<'_>> {
        let addr: Address = text.parse()?;
        self.resolve(&addr)
    }

    /// Like [`resolve`](Self::resolve) but also reports the matched interval
    /// and the search cost
    pub fn locate(&self, addr: &Address) -> Result<Probe<'_>> {
        let intervals = self.partition(addr.family())?;
        let (candidate, steps) = rightmost_start_at_or_below(intervals, addr.value());

        let record = candidate
            .map(|i| &intervals[i])
            .filter(|rec| addr.value() <= rec.end());

        Ok(Probe { record, steps })
    }

    /// Total intervals across both families (0 when unbuilt)
    pub fn len(&self) -> usize {
        match &self.state {
            State::Unbuilt => 0,
            State::Built { v4, v6 } => v4.len() + v6.len(),
        }
    }

    /// True when unbuilt or built from no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All intervals, IPv4 first, each family sorted by start
    pub fn iter(&self) -> impl Iterator<Item = &IntervalRecord> {
        let (v4, v6) = match &self.state {
            State::Unbuilt => (&[][..], &[][..]),
            State::Built { v4, v6 } => (v4.as_slice(), v6.as_slice()),
        };
        v4.iter().chain(v6.iter())
    }

    /// Counts describing the built index
    pub fn stats(&self) -> Result<IndexStats> {
        let (v4, v6) = match &self.state {
            State::Unbuilt => return Err(IndexError::NotBuilt),
            State::Built { v4, v6 } => (v4, v6),
        };

        let labels: BTreeSet<&str> = v4.iter().chain(v6.iter()).map(|r| r.label()).collect();
        let covered: u128 = v4.iter().map(|r| r.span()).sum();

        Ok(IndexStats {
            v4_intervals: v4.len(),
            v6_intervals: v6.len(),
            labels: labels.len(),
            v4_addresses_covered: covered as u64,
        })
    }

    fn partition(&self, family: IpFamily) -> Result<&[IntervalRecord]> {
        match &self.state {
            State::Unbuilt => Err(IndexError::NotBuilt),
            State::Built { v4, .. } if family == IpFamily::V4 => Ok(v4.as_slice()),
            State::Built { v6, .. } => Ok(v6.as_slice()),
        }
    }
}

fn sort_partition(intervals: &mut [IntervalRecord]) {
    if intervals.len() > PARALLEL_SORT_THRESHOLD {
        intervals.par_sort_unstable_by_key(|r| r.start());
    } else {
        intervals.sort_unstable_by_key(|r| r.start());
    }
}

/// Sorted input: adjacent pairs must satisfy `previous.end < current.start`
fn check_disjoint(intervals: &[IntervalRecord]) -> Result<()> {
    for pair in intervals.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if previous.end() >= current.start() {
            return Err(IndexError::OverlappingRange {
                previous: previous.to_string(),
                current: current.to_string(),
            });
        }
    }
    Ok(())
}

/// Index of the last interval whose start is `<= value`, plus steps taken
fn rightmost_start_at_or_below(intervals: &[IntervalRecord], value: u128) -> (Option<usize>, u32) {
    let mut lo = 0usize;
    let mut hi = intervals.len();
    let mut steps = 0u32;

    // Invariant: starts in [0, lo) are <= value, starts in [hi, len) are > value
    while lo < hi {
        steps += 1;
        let mid = lo + (hi - lo) / 2;
        if intervals[mid].start() <= value {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    (lo.checked_sub(1), steps)
}

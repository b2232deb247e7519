//! Error types for dataset loading, index building and retrieval

use thiserror::Error;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Why a single dataset row was rejected
///
/// Row errors never abort a load; the loader collects them and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// Wrong field count, unparsable address, mixed families or start > end
    #[error("malformed row: {reason}")]
    Malformed {
        /// Human readable description of the problem
        reason: String,
    },

    /// The label column is blank
    #[error("empty label")]
    EmptyLabel,
}

impl RowError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        RowError::Malformed {
            reason: reason.into(),
        }
    }
}

/// Fatal errors while reading a dataset
#[derive(Debug, Error)]
pub enum LoadError {
    /// The dataset could not be retrieved or read
    #[error("dataset source unavailable: {0}")]
    SourceUnavailable(String),

    /// Skip rate exceeded the caller supplied threshold
    #[error("{skipped} of {rows} rows were skipped (limit {limit:.2}%)")]
    TooManySkipped {
        /// Rows rejected during the pass
        skipped: usize,
        /// Rows read in total
        rows: usize,
        /// Threshold as a percentage
        limit: f64,
    },
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::SourceUnavailable(err.to_string())
    }
}

impl From<SourceError> for LoadError {
    fn from(err: SourceError) -> Self {
        LoadError::SourceUnavailable(err.to_string())
    }
}

/// Errors produced by [`RangeIndex`](crate::RangeIndex)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Two intervals of the same family share at least one address
    #[error("overlapping ranges: {previous} and {current}")]
    OverlappingRange {
        /// The interval that sorts first
        previous: String,
        /// The interval whose start falls inside `previous`
        current: String,
    },

    /// Query issued before the index was built
    #[error("range index has not been built")]
    NotBuilt,

    /// `build` called on an index that is already built
    #[error("range index is already built; create a new index to load fresh data")]
    AlreadyBuilt,

    /// Query text is not an IPv4 or IPv6 address
    #[error("invalid IP address: {0:?}")]
    InvalidAddress(String),
}

/// Errors from dataset retrieval
#[derive(Debug, Error)]
pub enum SourceError {
    /// Local I/O failure (open, read, cache write)
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted
        context: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Remote server answered with a failure status
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL
        url: String,
        /// Response status code
        status: u16,
    },

    /// Download exceeded the configured size cap
    #[error("download from {url} exceeds {limit} bytes")]
    TooLarge {
        /// Requested URL
        url: String,
        /// Size cap in bytes
        limit: u64,
    },

    /// Transport-level failure (DNS, TLS, timeout, ...)
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL
        url: String,
        /// Error text from the HTTP client
        message: String,
    },
}

impl SourceError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SourceError::Io {
            context: context.into(),
            source,
        }
    }
}

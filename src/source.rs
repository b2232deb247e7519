//! Dataset retrieval
//!
//! The index only needs "bytes in the dataset format, or an error". This
//! module supplies that through the [`DatasetSource`] trait, an HTTP
//! implementation with retries, and a file cache wrapper so a dataset is
//! downloaded once and reused.

use chrono::Datelike;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SourceError;

/// Base URL of the free db-ip country dataset
pub const DBIP_BASE_URL: &str = "https://download.db-ip.com/free";

/// Anything that can produce raw dataset bytes
pub trait DatasetSource {
    /// Short description for logs and error messages
    fn describe(&self) -> String;

    /// Retrieve the complete dataset
    fn fetch(&self) -> Result<Vec<u8>, SourceError>;
}

impl<S: DatasetSource + ?Sized> DatasetSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        (**self).fetch()
    }
}

/// URL of the db-ip "country lite" dump for a given month
pub fn dbip_country_lite_url(year: i32, month: u32) -> String {
    format!(
        "{}/dbip-country-lite-{:04}-{:02}.csv.gz",
        DBIP_BASE_URL, year, month
    )
}

/// db-ip dump URL for the current UTC month
pub fn default_dataset_url() -> String {
    let now = chrono::Utc::now();
    dbip_country_lite_url(now.year(), now.month())
}

/// Current and previous month dump URLs, newest first
///
/// db-ip publishes a new dump at some point during the month, so early in a
/// month only the previous one may exist.
pub fn recent_dataset_urls() -> Vec<String> {
    let now = chrono::Utc::now();
    let (year, month) = previous_month(now.year(), now.month());
    vec![
        dbip_country_lite_url(now.year(), now.month()),
        dbip_country_lite_url(year, month),
    ]
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Per-user cache directory: `$XDG_CACHE_HOME/ipcountry`, `~/.cache/ipcountry`,
/// or the system temp dir as a last resort
pub fn default_cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CACHE_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join("ipcountry");
    }
    if let Some(home) = std::env::var_os("HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(home).join(".cache").join("ipcountry");
    }
    std::env::temp_dir().join("ipcountry")
}

/// File name used to cache a URL: its last path segment
pub fn cache_file_name(url: &str) -> String {
    url.split(|c: char| c == '?' || c == '#')
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("dataset.csv.gz")
        .to_string()
}

/// Wraps another source and keeps its bytes on disk
///
/// A cached copy younger than `max_age` is returned without touching the
/// inner source. `max_age` of `None` reuses the cache forever.
pub struct CachedSource<S> {
    inner: S,
    cache_path: PathBuf,
    max_age: Option<Duration>,
}

impl<S: DatasetSource> CachedSource<S> {
    /// Cache `inner` at `cache_dir/file_name`
    pub fn new(inner: S, cache_dir: impl AsRef<Path>, file_name: &str) -> Self {
        Self {
            inner,
            cache_path: cache_dir.as_ref().join(file_name),
            max_age: None,
        }
    }

    /// Refetch once the cached copy is older than this
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Where the cached bytes live
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Drop the cached copy so the next fetch goes to the inner source
    pub fn invalidate(&self) -> Result<(), SourceError> {
        match fs::remove_file(&self.cache_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SourceError::io(
                format!("failed to remove {}", self.cache_path.display()),
                e,
            )),
        }
    }

    fn is_fresh(&self) -> bool {
        let Ok(meta) = fs::metadata(&self.cache_path) else {
            return false;
        };
        let Some(max_age) = self.max_age else {
            return true;
        };
        meta.modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age < max_age)
    }

    fn read_cache(&self) -> Result<Vec<u8>, SourceError> {
        fs::read(&self.cache_path).map_err(|e| {
            SourceError::io(format!("failed to read {}", self.cache_path.display()), e)
        })
    }

    fn write_cache(&self, bytes: &[u8]) -> Result<(), SourceError> {
        let dir = self.cache_path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| {
            SourceError::io(format!("failed to create cache directory {}", dir.display()), e)
        })?;

        // Write beside the target and rename so readers never see a partial file
        let tmp = self
            .cache_path
            .with_extension(format!("tmp-{}", std::process::id()));
        fs::write(&tmp, bytes)
            .map_err(|e| SourceError::io(format!("failed to write {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.cache_path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            SourceError::io(format!("failed to move {} into place", tmp.display()), e)
        })
    }
}

impl<S: DatasetSource> DatasetSource for CachedSource<S> {
    fn describe(&self) -> String {
        format!("{} (cached at {})", self.inner.describe(), self.cache_path.display())
    }

    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        if self.is_fresh() {
            log::info!("Using cached dataset {}", self.cache_path.display());
            return self.read_cache();
        }

        match self.inner.fetch() {
            Ok(bytes) => {
                if let Err(e) = self.write_cache(&bytes) {
                    log::warn!("Could not cache dataset: {}", e);
                }
                Ok(bytes)
            }
            Err(e) if self.cache_path.exists() => {
                log::warn!(
                    "Fetching {} failed ({}); falling back to stale cache {}",
                    self.inner.describe(),
                    e,
                    self.cache_path.display()
                );
                self.read_cache()
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(feature = "remote")]
pub use http::HttpSource;

#[cfg(feature = "remote")]
mod http {
    use std::io::Read;
    use std::time::Duration;

    use super::DatasetSource;
    use crate::error::SourceError;

    /// Default size cap: the db-ip lite dump is a few MB compressed
    const DEFAULT_MAX_BYTES: u64 = 256 * 1024 * 1024;

    /// Upper bound for a single retry delay
    const MAX_BACKOFF: Duration = Duration::from_secs(60);

    /// Downloads a dataset over HTTP(S) with retries
    #[derive(Debug, Clone)]
    pub struct HttpSource {
        url: String,
        timeout: Duration,
        max_attempts: u32,
        backoff: Duration,
        max_bytes: u64,
    }

    impl HttpSource {
        /// Source for `url` with a 5 minute timeout and 3 attempts
        pub fn new(url: impl Into<String>) -> Self {
            Self {
                url: url.into(),
                timeout: Duration::from_secs(300),
                max_attempts: 3,
                backoff: Duration::from_secs(2),
                max_bytes: DEFAULT_MAX_BYTES,
            }
        }

        /// Per-request timeout
        pub fn timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }

        /// Total attempts before giving up (at least 1)
        pub fn max_attempts(mut self, attempts: u32) -> Self {
            self.max_attempts = attempts.max(1);
            self
        }

        /// First retry delay; doubles on every further retry
        pub fn backoff(mut self, backoff: Duration) -> Self {
            self.backoff = backoff;
            self
        }

        /// Reject bodies larger than this
        pub fn max_bytes(mut self, max_bytes: u64) -> Self {
            self.max_bytes = max_bytes;
            self
        }

        /// Requested URL
        pub fn url(&self) -> &str {
            &self.url
        }

        /// Delay before retrying after failed attempt `attempt` (1-based):
        /// `backoff * 2^(attempt - 1)`, capped at [`MAX_BACKOFF`]
        fn retry_delay(&self, attempt: u32) -> Duration {
            let factor = 2u32
                .checked_pow(attempt.saturating_sub(1))
                .unwrap_or(u32::MAX);
            self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
        }

        fn transport(&self, err: reqwest::Error) -> SourceError {
            SourceError::Transport {
                url: self.url.clone(),
                message: err.to_string(),
            }
        }

        fn download(&self) -> Result<Vec<u8>, SourceError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .user_agent(concat!("ipcountry/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| self.transport(e))?;

            let response = client
                .get(&self.url)
                .send()
                .map_err(|e| self.transport(e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status {
                    url: self.url.clone(),
                    status: status.as_u16(),
                });
            }

            let too_large = || SourceError::TooLarge {
                url: self.url.clone(),
                limit: self.max_bytes,
            };
            if response.content_length().is_some_and(|len| len > self.max_bytes) {
                return Err(too_large());
            }

            // Content-Length can be absent or wrong, so cap the read as well
            let mut bytes = Vec::new();
            response
                .take(self.max_bytes + 1)
                .read_to_end(&mut bytes)
                .map_err(|e| SourceError::io(format!("failed to read body of {}", self.url), e))?;
            if bytes.len() as u64 > self.max_bytes {
                return Err(too_large());
            }

            Ok(bytes)
        }
    }

    fn is_retryable(err: &SourceError) -> bool {
        !matches!(err, SourceError::Status { status, .. } if (400..500).contains(status))
            && !matches!(err, SourceError::TooLarge { .. })
    }

    impl DatasetSource for HttpSource {
        fn describe(&self) -> String {
            self.url.clone()
        }

        fn fetch(&self) -> Result<Vec<u8>, SourceError> {
            log::info!("Downloading dataset from {}", self.url);

            let mut attempt = 1;
            loop {
                match self.download() {
                    Ok(bytes) => {
                        log::info!("Downloaded {} bytes from {}", bytes.len(), self.url);
                        return Ok(bytes);
                    }
                    Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                        let delay = self.retry_delay(attempt);
                        log::warn!(
                            "Download attempt {}/{} failed: {}; retrying in {:?}",
                            attempt,
                            self.max_attempts,
                            e,
                            delay
                        );
                        std::thread::sleep(delay);
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

}

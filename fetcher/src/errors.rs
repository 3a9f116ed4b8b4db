/// Error types for the Magpie fetcher.
///
/// Only setup failures live here; per-task download failures are
/// recorded as `Outcome` values and never abort a batch.
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a batch before any task runs.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot read manifest {}: {source}", .path.display())]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create destination directory {}: {source}", .path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result type alias for Magpie operations.
pub type FetchResult<T> = Result<T, FetchError>;

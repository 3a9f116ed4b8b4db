/// Magpie fetcher library.
///
/// Turns a manifest of image sources into files on disk: parse the
/// manifest into download tasks, fetch them concurrently with a bounded
/// worker pool, skip anything already present, and hand back one result
/// per task.
pub mod batch;
pub mod errors;
pub mod manifest;
pub mod models;
pub mod naming;

pub use batch::{run, FetchConfig};
pub use errors::{FetchError, FetchResult};
pub use models::{DownloadResult, DownloadTask, Outcome, RunSummary, TargetName};

/// Concurrent batch download engine.
///
/// Spawns one task per manifest entry, bounded by a semaphore so at
/// most `concurrency` downloads are in flight. Workers share nothing
/// but the permit pool; each runs the full fetch procedure to
/// completion and reports exactly one outcome. Individual failures
/// never abort the batch.
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{FetchError, FetchResult};
use crate::models::{DownloadResult, DownloadTask, Outcome};

/// Browser-like User-Agent, to reduce trivial blocking by image hosts.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Batch settings. Defaults match the dataset collection scripts this
/// replaces: 8 workers, 10 second timeout.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum downloads in flight at once. Must be at least 1.
    pub concurrency: usize,
    /// Per-request timeout covering connect and body transfer.
    pub timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Run a batch: fetch every task into `destination_dir`.
///
/// Creates `destination_dir` if absent. Returns one result per input
/// task, in no particular order. Only setup failures (unwritable
/// destination, bad concurrency, client construction) are `Err`;
/// per-task failures are `Outcome` values in the result list.
pub async fn run(
    tasks: Vec<DownloadTask>,
    destination_dir: &Path,
    config: &FetchConfig,
) -> FetchResult<Vec<DownloadResult>> {
    if config.concurrency == 0 {
        return Err(FetchError::ZeroConcurrency);
    }
    std::fs::create_dir_all(destination_dir).map_err(|source| {
        FetchError::DestinationUnwritable {
            path: destination_dir.to_path_buf(),
            source,
        }
    })?;

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(&config.user_agent)
        .build()?;

    info!(
        "starting batch: {} tasks, concurrency {}, destination {}",
        tasks.len(),
        config.concurrency,
        destination_dir.display()
    );

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut workers = JoinSet::new();
    let expected = tasks.len();

    for task in tasks {
        let client = client.clone();
        let semaphore = Arc::clone(&semaphore);
        let dir = destination_dir.to_path_buf();
        workers.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    // only possible if the pool is torn down mid-run
                    warn!("worker pool closed before {} could start", task.source_url);
                    return DownloadResult {
                        outcome: Outcome::TransportError("worker pool closed".to_string()),
                        task,
                    };
                }
            };
            let outcome = fetch_one(&client, &dir, &task).await;
            DownloadResult { task, outcome }
        });
    }

    let mut results = Vec::with_capacity(expected);
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => error!("download worker panicked: {e}"),
        }
    }
    Ok(results)
}

/// Fetch a single task. Never fails the batch; every exit path maps to
/// an `Outcome`.
async fn fetch_one(client: &reqwest::Client, destination_dir: &Path, task: &DownloadTask) -> Outcome {
    if task.exists_in(destination_dir) {
        debug!("already exists, skipping {}", task.source_url);
        return Outcome::AlreadyExists;
    }

    let response = match client.get(&task.source_url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("transport error for {}: {e}", task.source_url);
            return Outcome::TransportError(e.to_string());
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!("HTTP {} for {}", status.as_u16(), task.source_url);
        return Outcome::HttpError(status.as_u16());
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            warn!("body transfer failed for {}: {e}", task.source_url);
            return Outcome::TransportError(e.to_string());
        }
    };

    let name = task.resolved_name(content_type.as_deref());
    match tokio::fs::write(destination_dir.join(&name), &body).await {
        Ok(()) => {
            info!("downloaded {} ({} bytes)", name, body.len());
            Outcome::Success
        }
        Err(e) => {
            warn!("failed to write {name}: {e}");
            Outcome::IoError(e.to_string())
        }
    }
}

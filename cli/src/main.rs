/// Magpie - Batch Image Fetcher - Main Entry Point
///
/// Reads a manifest of image sources, downloads them concurrently into
/// a destination directory (skipping files already present), and logs a
/// run summary. One-shot batch: no retries, no persisted queue; re-run
/// the same manifest to pick up earlier failures.
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};

use magpie_fetcher::{batch, manifest, FetchConfig, RunSummary};

/// Which manifest shape the input file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManifestFormat {
    /// `<destination_name>\t<source_url>` per line.
    Pairs,
    /// Bare URL per line, names derived from the URL.
    Urls,
}

/// Run configuration, resolved from arguments and environment.
#[derive(Debug)]
struct Config {
    manifest_path: PathBuf,
    output_dir: PathBuf,
    format: ManifestFormat,
    prefix: String,
    concurrency: usize,
    timeout_secs: u64,
    limit_per_file: usize,
    summary_json: bool,
}

impl Config {
    /// Resolve configuration. Positional arguments take priority over
    /// environment variables; everything but the manifest path has a
    /// default.
    fn resolve() -> anyhow::Result<Self> {
        let mut args = std::env::args().skip(1);

        let manifest_path = args
            .next()
            .or_else(|| std::env::var("MAGPIE_MANIFEST").ok())
            .context("no manifest given (pass it as the first argument or set MAGPIE_MANIFEST)")?;

        let output_dir = args
            .next()
            .or_else(|| std::env::var("MAGPIE_OUTPUT_DIR").ok())
            .unwrap_or_else(|| "./images".to_string());

        let format = match std::env::var("MAGPIE_MANIFEST_FORMAT")
            .unwrap_or_else(|_| "pairs".to_string())
            .as_str()
        {
            "pairs" => ManifestFormat::Pairs,
            "urls" => ManifestFormat::Urls,
            other => anyhow::bail!("MAGPIE_MANIFEST_FORMAT must be 'pairs' or 'urls', got '{other}'"),
        };

        let prefix = std::env::var("MAGPIE_PREFIX").unwrap_or_else(|_| "image".to_string());

        let concurrency = std::env::var("MAGPIE_CONCURRENCY")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .context("MAGPIE_CONCURRENCY must be a positive integer")?;

        let timeout_secs = std::env::var("MAGPIE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("MAGPIE_TIMEOUT_SECS must be a positive integer")?;

        let limit_per_file = match std::env::var("MAGPIE_LIMIT_PER_FILE") {
            Ok(raw) => raw
                .parse()
                .context("MAGPIE_LIMIT_PER_FILE must be a positive integer")?,
            Err(_) => usize::MAX,
        };

        Ok(Self {
            manifest_path: PathBuf::from(manifest_path),
            output_dir: PathBuf::from(output_dir),
            format,
            prefix,
            concurrency,
            timeout_secs,
            limit_per_file,
            summary_json: std::env::var("MAGPIE_SUMMARY_JSON").is_ok(),
        })
    }
}

#[tokio::main]
async fn main() {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("=== Magpie Batch Fetcher ===");

    let config = match Config::resolve() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e:#}");
            error!("usage: magpie <manifest> [output_dir]");
            std::process::exit(2);
        }
    };

    // Load the manifest. Unreadable manifest is fatal; no task runs.
    let tasks = match load_tasks(&config) {
        Ok(tasks) => tasks,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    if tasks.is_empty() {
        warn!(
            "manifest {} contains no tasks",
            config.manifest_path.display()
        );
    } else {
        info!(
            "loaded {} tasks from {}",
            tasks.len(),
            config.manifest_path.display()
        );
    }

    let fetch_config = FetchConfig {
        concurrency: config.concurrency,
        timeout: Duration::from_secs(config.timeout_secs),
        ..FetchConfig::default()
    };

    let started_at = chrono::Utc::now();
    let results = match batch::run(tasks, &config.output_dir, &fetch_config).await {
        Ok(results) => results,
        Err(e) => {
            error!("batch aborted: {e}");
            std::process::exit(1);
        }
    };

    let summary = RunSummary::from_results(&results, started_at, chrono::Utc::now());
    info!("batch complete: {summary}");
    info!("images saved to {}", config.output_dir.display());

    if config.summary_json {
        match serde_json::to_string(&summary) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("could not serialize summary: {e}"),
        }
    }

    // Per-task failures are reported in the summary, not the exit code;
    // a re-run of the same manifest retries only what is missing.
}

/// Load tasks according to the configured manifest shape. A manifest
/// path that is a directory loads every `.txt` pairs file inside it.
fn load_tasks(config: &Config) -> magpie_fetcher::FetchResult<Vec<magpie_fetcher::DownloadTask>> {
    let path: &Path = &config.manifest_path;
    match config.format {
        ManifestFormat::Urls => manifest::load_urls(path, &config.prefix),
        ManifestFormat::Pairs if path.is_dir() => {
            manifest::load_pairs_dir(path, config.limit_per_file)
        }
        ManifestFormat::Pairs => manifest::load_pairs(path),
    }
}

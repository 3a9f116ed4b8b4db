/// Core data model for a batch run: tasks, per-task outcomes, and the
/// aggregated run summary.
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::naming;

/// How the destination file name is determined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetName {
    /// The manifest supplied the file name directly.
    Explicit(String),
    /// Name is derived from the source URL: `<prefix>_<hash>.<ext>`.
    /// `ext` is known up front only when the URL path carries one;
    /// otherwise it is resolved from the response content type.
    Derived {
        prefix: String,
        ext: Option<String>,
    },
}

/// One item of work: fetch `source_url`, store it under `target`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadTask {
    pub source_url: String,
    pub target: TargetName,
}

impl DownloadTask {
    /// Task with an explicit destination name (pairs manifest).
    ///
    /// Manifests sometimes carry path-qualified names; only the final
    /// file name is kept, so every download lands flat inside the
    /// destination directory and a name like `../x.jpg` cannot escape
    /// it.
    pub fn explicit(destination_name: impl Into<String>, source_url: impl Into<String>) -> Self {
        let destination_name = destination_name.into();
        let base = destination_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&destination_name)
            .to_string();
        Self {
            source_url: source_url.into(),
            target: TargetName::Explicit(base),
        }
    }

    /// Task with a URL-derived destination name (bare URL manifest).
    pub fn derived(prefix: impl Into<String>, source_url: impl Into<String>) -> Self {
        let source_url = source_url.into();
        let ext = naming::ext_from_url(&source_url);
        Self {
            target: TargetName::Derived {
                prefix: prefix.into(),
                ext,
            },
            source_url,
        }
    }

    /// File-name stem (`<prefix>_<hash>`) for derived targets.
    pub fn derived_stem(&self) -> Option<String> {
        match &self.target {
            TargetName::Explicit(_) => None,
            TargetName::Derived { prefix, .. } => {
                Some(format!("{}_{}", prefix, naming::url_hash(&self.source_url)))
            }
        }
    }

    /// Final on-disk file name, given the response content type when a
    /// derived target did not get an extension from its URL.
    pub fn resolved_name(&self, content_type: Option<&str>) -> String {
        match &self.target {
            TargetName::Explicit(name) => name.clone(),
            TargetName::Derived { prefix, ext } => {
                let ext = ext
                    .as_deref()
                    .or_else(|| content_type.and_then(naming::ext_from_content_type))
                    .unwrap_or("jpg");
                format!("{}_{}.{}", prefix, naming::url_hash(&self.source_url), ext)
            }
        }
    }

    /// Whether this task's output is already present in `dir`.
    ///
    /// Explicit names are checked directly. Derived names match on the
    /// stem, so a file saved by an earlier run with a
    /// content-type-derived extension is still found without a request.
    pub fn exists_in(&self, dir: &Path) -> bool {
        match &self.target {
            TargetName::Explicit(name) => dir.join(name).exists(),
            TargetName::Derived { .. } => {
                let Some(stem) = self.derived_stem() else {
                    return false;
                };
                let needle = format!("{stem}.");
                match std::fs::read_dir(dir) {
                    Ok(entries) => entries
                        .flatten()
                        .any(|e| e.file_name().to_string_lossy().starts_with(&needle)),
                    Err(_) => false,
                }
            }
        }
    }
}

/// Outcome of a single task. Produced exactly once per task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Body written to the destination file.
    Success,
    /// Destination pre-existed; no network call was made.
    AlreadyExists,
    /// Response received with a non-success status code.
    HttpError(u16),
    /// DNS/connect/timeout failure, or the body stream broke.
    TransportError(String),
    /// Body arrived but could not be written to disk.
    IoError(String),
}

impl Outcome {
    /// Whether this outcome counts as a failure in the run summary.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::HttpError(_) | Outcome::TransportError(_) | Outcome::IoError(_)
        )
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::AlreadyExists => write!(f, "already exists"),
            Outcome::HttpError(status) => write!(f, "HTTP {status}"),
            Outcome::TransportError(msg) => write!(f, "transport error: {msg}"),
            Outcome::IoError(msg) => write!(f, "write error: {msg}"),
        }
    }
}

/// One result per input task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResult {
    pub task: DownloadTask,
    pub outcome: Outcome,
}

/// Aggregated counts for a completed batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn from_results(
        results: &[DownloadResult],
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let succeeded = results
            .iter()
            .filter(|r| r.outcome == Outcome::Success)
            .count();
        let skipped = results
            .iter()
            .filter(|r| r.outcome == Outcome::AlreadyExists)
            .count();
        let failed = results.iter().filter(|r| r.outcome.is_failure()).count();
        Self {
            total: results.len(),
            succeeded,
            skipped,
            failed,
            started_at,
            finished_at,
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} downloaded, {} already present, {} failed ({} total, {}s)",
            self.succeeded,
            self.skipped,
            self.failed,
            self.total,
            (self.finished_at - self.started_at).num_seconds()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_resolved_name() {
        let task = DownloadTask::explicit("a.jpg", "http://x/1");
        assert_eq!(task.resolved_name(None), "a.jpg");
        assert_eq!(task.resolved_name(Some("image/png")), "a.jpg");
    }

    #[test]
    fn test_derived_name_uses_url_extension() {
        let task = DownloadTask::derived("nose", "http://x.com/photo.PNG?w=640");
        let name = task.resolved_name(None);
        assert!(name.starts_with("nose_"));
        assert!(name.ends_with(".png"));
        // prefix + '_' + 8 hex chars + ".png"
        assert_eq!(name.len(), "nose_".len() + 8 + ".png".len());
    }

    #[test]
    fn test_derived_name_falls_back_to_content_type() {
        let task = DownloadTask::derived("nose", "http://x.com/photo");
        assert!(task.resolved_name(Some("image/webp")).ends_with(".webp"));
    }

    #[test]
    fn test_derived_name_defaults_to_jpg() {
        let task = DownloadTask::derived("nose", "http://x.com/photo");
        assert!(task.resolved_name(None).ends_with(".jpg"));
        assert!(task.resolved_name(Some("text/html")).ends_with(".jpg"));
    }

    #[test]
    fn test_explicit_name_keeps_only_the_file_name() {
        let task = DownloadTask::explicit("yoga_pose/img_001.jpg", "http://x/1");
        assert_eq!(task.resolved_name(None), "img_001.jpg");

        let task = DownloadTask::explicit(r"dataset\pose\img_002.jpg", "http://x/2");
        assert_eq!(task.resolved_name(None), "img_002.jpg");
    }

    #[test]
    fn test_explicit_name_cannot_escape_destination() {
        let task = DownloadTask::explicit("../../evil.jpg", "http://x/1");
        assert_eq!(task.resolved_name(None), "evil.jpg");

        let dir = tempfile::tempdir().unwrap();
        // the check looks inside the directory, not at the traversal path
        assert!(!task.exists_in(dir.path()));
        std::fs::write(dir.path().join("evil.jpg"), b"x").unwrap();
        assert!(task.exists_in(dir.path()));
    }

    #[test]
    fn test_exists_in_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let task = DownloadTask::explicit("a.jpg", "http://x/1");
        assert!(!task.exists_in(dir.path()));
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        assert!(task.exists_in(dir.path()));
    }

    #[test]
    fn test_exists_in_derived_matches_any_extension() {
        let dir = tempfile::tempdir().unwrap();
        let task = DownloadTask::derived("nose", "http://x.com/photo");
        assert!(!task.exists_in(dir.path()));

        // an earlier run saved this URL with a content-type-derived ext
        let stem = task.derived_stem().unwrap();
        std::fs::write(dir.path().join(format!("{stem}.webp")), b"x").unwrap();
        assert!(task.exists_in(dir.path()));
    }

    #[test]
    fn test_summary_counts() {
        let now = Utc::now();
        let results = vec![
            DownloadResult {
                task: DownloadTask::explicit("a.jpg", "http://x/1"),
                outcome: Outcome::Success,
            },
            DownloadResult {
                task: DownloadTask::explicit("b.jpg", "http://x/2"),
                outcome: Outcome::AlreadyExists,
            },
            DownloadResult {
                task: DownloadTask::explicit("c.jpg", "http://x/3"),
                outcome: Outcome::HttpError(404),
            },
            DownloadResult {
                task: DownloadTask::explicit("d.jpg", "http://x/4"),
                outcome: Outcome::TransportError("timed out".into()),
            },
        ];
        let summary = RunSummary::from_results(&results, now, now);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 2);
    }

    #[test]
    fn test_summary_json_round_trip() {
        let now = Utc::now();
        let results = vec![DownloadResult {
            task: DownloadTask::explicit("a.jpg", "http://x/1"),
            outcome: Outcome::Success,
        }];
        let summary = RunSummary::from_results(&results, now, now);

        let json = serde_json::to_string(&summary).unwrap();
        let parsed: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total, 1);
        assert_eq!(parsed.succeeded, 1);
        assert_eq!(parsed.started_at, summary.started_at);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::HttpError(404).to_string(), "HTTP 404");
        assert_eq!(Outcome::AlreadyExists.to_string(), "already exists");
    }
}

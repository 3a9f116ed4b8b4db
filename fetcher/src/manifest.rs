/// Manifest parsing.
///
/// Two shapes are supported: tab-separated `<name>\t<url>` pairs, and
/// bare URL lists whose file names are derived from the URL. A
/// directory of pair manifests can also be loaded with a per-file line
/// cap, for datasets split across many `.txt` files.
use std::fs;
use std::path::Path;

use crate::errors::{FetchError, FetchResult};
use crate::models::DownloadTask;

/// Load a tab-separated pairs manifest: one `<name>\t<url>` per line.
pub fn load_pairs(path: &Path) -> FetchResult<Vec<DownloadTask>> {
    let text = fs::read_to_string(path).map_err(|source| FetchError::ManifestUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_pairs(&text, usize::MAX))
}

/// Load a bare-URL manifest: one URL per line, names derived with the
/// given prefix.
pub fn load_urls(path: &Path, prefix: &str) -> FetchResult<Vec<DownloadTask>> {
    let text = fs::read_to_string(path).map_err(|source| FetchError::ManifestUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|url| DownloadTask::derived(prefix, url))
        .collect())
}

/// Load every `.txt` pairs manifest in a directory, taking at most
/// `limit_per_file` entries from each. Files are visited in name order
/// so repeated runs see the same task list.
pub fn load_pairs_dir(dir: &Path, limit_per_file: usize) -> FetchResult<Vec<DownloadTask>> {
    let entries = fs::read_dir(dir).map_err(|source| FetchError::ManifestUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    paths.sort();

    let mut tasks = Vec::new();
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|source| FetchError::ManifestUnreadable {
            path: path.clone(),
            source,
        })?;
        tasks.extend(parse_pairs(&text, limit_per_file));
    }
    Ok(tasks)
}

/// Parse pair lines, keeping at most `limit` tasks. Blank lines and
/// lines without both fields are skipped.
fn parse_pairs(text: &str, limit: usize) -> Vec<DownloadTask> {
    text.lines()
        .map(str::trim)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 2 || parts[0].is_empty() || parts[1].is_empty() {
                return None;
            }
            Some(DownloadTask::explicit(parts[0], parts[1]))
        })
        .take(limit)
        .collect()
}

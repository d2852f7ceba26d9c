//! Glob file listing inside the workspace, newest first.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use delve_types::{
    DEFAULT_IGNORE_DIRS, GlobFile, GlobMetadata, GlobToolResult, Guarded, SafeError, TextContent,
};

use super::SearchError;
use super::boundary::WorkspaceBoundary;
use super::process::{ProcessRunner, RunOptions};

pub const DEFAULT_GLOB_LIMIT: usize = 100;

/// Listing lines read before the child is stopped. Sorting needs the whole listing, so
/// this is far above the result limit.
pub const DEFAULT_GLOB_SCAN_CAP: usize = 50_000;

const TRUNCATION_NOTE: &str =
    "(Results are truncated. Consider using a more specific path or pattern.)";

#[derive(Debug, Clone)]
pub struct GlobOptions {
    pub limit: usize,
    pub scan_cap: usize,
    /// List only the top level of an explicit subdirectory when the pattern has no `**`.
    pub shallow_subdirs: bool,
    pub timeout: Option<Duration>,
}

impl Default for GlobOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_GLOB_LIMIT,
            scan_cap: DEFAULT_GLOB_SCAN_CAP,
            shallow_subdirs: true,
            timeout: None,
        }
    }
}

pub struct GlobSearch<'a> {
    runner: &'a ProcessRunner,
    boundary: &'a WorkspaceBoundary,
    options: GlobOptions,
}

struct Listed {
    relative: String,
    basename: String,
    modified: SystemTime,
}

impl<'a> GlobSearch<'a> {
    #[must_use]
    pub fn new(
        runner: &'a ProcessRunner,
        boundary: &'a WorkspaceBoundary,
        options: GlobOptions,
    ) -> Self {
        Self {
            runner,
            boundary,
            options,
        }
    }

    /// List files under `path` (default: the workspace root) matching `pattern`.
    ///
    /// Paths outside the workspace and missing directories are returned as rejections;
    /// process failures are errors.
    pub async fn search(
        &self,
        pattern: &str,
        path: Option<&str>,
    ) -> Result<Guarded<GlobToolResult>, SearchError> {
        if pattern.trim().is_empty() {
            return Err(SearchError::InvalidRequest {
                message: "pattern must not be empty".to_string(),
            });
        }
        if self.options.limit == 0 {
            return Err(SearchError::InvalidRequest {
                message: "limit must be at least 1".to_string(),
            });
        }

        let requested = path.unwrap_or_default().to_string();
        let dir = match self.boundary.resolve(path) {
            Ok(dir) => dir,
            Err(SearchError::PathTraversal { attempted, .. }) => {
                tracing::warn!(path = %attempted.display(), "Glob path outside workspace");
                return Ok(Guarded::Rejected(SafeError::OutsideWorkspace { path: requested }));
            }
            Err(SearchError::PathNotFound { .. }) => {
                return Ok(Guarded::Rejected(SafeError::PathNotFound { path: requested }));
            }
            Err(e) => return Err(e),
        };
        if !dir.is_dir() {
            return Err(SearchError::InvalidRequest {
                message: format!("not a directory: {requested}"),
            });
        }

        let shallow = self.options.shallow_subdirs
            && dir.as_path() != self.boundary.root()
            && !pattern.contains("**");
        let args = listing_args(pattern, shallow);
        tracing::debug!(?args, dir = %dir.display(), "Running glob listing");

        let run = RunOptions::new(self.options.scan_cap)
            .in_dir(&dir)
            .with_timeout(self.options.timeout);
        let output = self.runner.run(&args, &run).await?;
        let mut truncated = output.summary.stopped_early();

        let mut listed: Vec<Listed> = output
            .lines
            .iter()
            .filter_map(|line| self.stat_listed(&dir, line))
            .collect();
        if listed.is_empty() {
            return Ok(Guarded::Rejected(SafeError::NoFilesFound));
        }

        // Stable: equal timestamps keep listing order.
        listed.sort_by(|a, b| b.modified.cmp(&a.modified));
        if listed.len() > self.options.limit {
            listed.truncate(self.options.limit);
            truncated = true;
        }

        let mut text = listed
            .iter()
            .map(|l| l.relative.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if truncated {
            text.push_str("\n\n");
            text.push_str(TRUNCATION_NOTE);
        }

        let files = listed
            .into_iter()
            .map(|l| GlobFile {
                mtime: epoch_millis(l.modified),
                path: l.relative,
                basename: l.basename,
            })
            .collect();

        Ok(Guarded::Found(GlobToolResult {
            content: vec![TextContent::Text { text }],
            metadata: GlobMetadata { files, truncated },
        }))
    }

    fn stat_listed(&self, dir: &Path, line: &str) -> Option<Listed> {
        let line = line.trim_end_matches('\r');
        let rel = line.strip_prefix("./").unwrap_or(line);
        let absolute: PathBuf = dir.join(rel);
        if !self.boundary.contains(&absolute) {
            tracing::warn!(path = %absolute.display(), "Dropping listed path outside workspace");
            return None;
        }
        let meta = match fs::metadata(&absolute) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::debug!(path = %absolute.display(), error = %e, "Skipping unreadable match");
                return None;
            }
        };
        let relative = self
            .boundary
            .relative(&absolute)
            .unwrap_or_else(|| rel.replace('\\', "/"));
        let basename = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(Listed {
            relative,
            basename,
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
        })
    }
}

fn listing_args(pattern: &str, shallow: bool) -> Vec<String> {
    let mut args = vec![
        "--files".to_string(),
        "--hidden".to_string(),
        "--no-config".to_string(),
        "--glob".to_string(),
        pattern.to_string(),
    ];
    for dir in DEFAULT_IGNORE_DIRS {
        args.push("--glob".to_string());
        args.push(format!("!{dir}"));
    }
    if shallow {
        args.push("--max-depth".to_string());
        args.push("1".to_string());
    }
    args
}

fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

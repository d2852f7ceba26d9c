//! Interactive path lookup: full inventory, fuzzy ranking, live type check.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path};
use std::time::Duration;

use delve_types::{EntryKind, FileEntry};
use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32Str};

use super::SearchError;
use super::boundary::WorkspaceBoundary;
use super::process::{ProcessRunner, RunOptions};

pub const DEFAULT_FUZZY_LIMIT: usize = 50;

/// Directories left out of the inventory.
pub const INVENTORY_IGNORE_DIRS: &[&str] = &[".git", "node_modules", "target", "dist", "build"];

const INVENTORY_CAP: usize = 200_000;

#[derive(Debug, Clone)]
pub struct FuzzyOptions {
    pub limit: usize,
    pub timeout: Option<Duration>,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_FUZZY_LIMIT,
            timeout: None,
        }
    }
}

pub struct FuzzyPathSearch<'a> {
    runner: &'a ProcessRunner,
    boundary: &'a WorkspaceBoundary,
    options: FuzzyOptions,
}

impl<'a> FuzzyPathSearch<'a> {
    #[must_use]
    pub fn new(
        runner: &'a ProcessRunner,
        boundary: &'a WorkspaceBoundary,
        options: FuzzyOptions,
    ) -> Self {
        Self {
            runner,
            boundary,
            options,
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<FileEntry>, SearchError> {
        let limit = self.options.limit;
        if limit == 0 {
            return Err(SearchError::InvalidRequest {
                message: "limit must be at least 1".to_string(),
            });
        }

        let inventory = self.inventory().await?;
        tracing::debug!(entries = inventory.len(), query, "Ranking fuzzy inventory");

        let query = query.trim();
        let picked: Vec<FileEntry> = if query.is_empty() {
            inventory.into_iter().take(limit).collect()
        } else {
            rank(inventory, query, limit)
        };
        Ok(picked
            .into_iter()
            .map(|entry| reverify_kind(entry, self.boundary.root()))
            .collect())
    }

    /// Every listed file followed by the folders implied by their parents.
    pub async fn inventory(&self) -> Result<Vec<FileEntry>, SearchError> {
        let mut args = vec![
            "--files".to_string(),
            "--hidden".to_string(),
            "--no-config".to_string(),
        ];
        for dir in INVENTORY_IGNORE_DIRS {
            args.push("--glob".to_string());
            args.push(format!("!{dir}"));
        }
        let run = RunOptions::new(INVENTORY_CAP)
            .in_dir(self.boundary.root())
            .with_timeout(self.options.timeout);
        let output = self.runner.run(&args, &run).await?;
        if output.summary.stopped_early() {
            tracing::warn!(lines = output.summary.lines_read, "File inventory is incomplete");
        }
        Ok(build_inventory(output.lines.iter().map(String::as_str)))
    }
}

/// Files in listing order, then synthesized folders in first-seen order.
///
/// Paths that are absolute or climb out with `..` are dropped.
pub fn build_inventory<'s>(listing: impl IntoIterator<Item = &'s str>) -> Vec<FileEntry> {
    let mut files = Vec::new();
    let mut folders = Vec::new();
    let mut seen_folders: HashSet<String> = HashSet::new();

    for raw in listing {
        let path = normalize_listed(raw);
        if path.is_empty() || !is_contained_relative(Path::new(&path)) {
            continue;
        }
        let mut parent = path.as_str();
        while let Some((dir, _)) = parent.rsplit_once('/') {
            if dir.is_empty() || !seen_folders.insert(dir.to_string()) {
                break;
            }
            folders.push(FileEntry::folder(dir));
            parent = dir;
        }
        files.push(FileEntry::file(path));
    }

    // Parents were pushed deepest-first; order each chain root-first.
    let mut ordered: Vec<FileEntry> = Vec::with_capacity(files.len() + folders.len());
    ordered.append(&mut files);
    ordered.extend(order_folders(folders));
    ordered
}

fn order_folders(folders: Vec<FileEntry>) -> Vec<FileEntry> {
    let mut out = Vec::with_capacity(folders.len());
    let mut chain: Vec<FileEntry> = Vec::new();
    for folder in folders {
        let extends_chain = chain
            .last()
            .is_some_and(|prev| prev.path.starts_with(&format!("{}/", folder.path)));
        if !extends_chain {
            out.extend(chain.drain(..).rev());
        }
        chain.push(folder);
    }
    out.extend(chain.into_iter().rev());
    out
}

/// Score, then sort by score desc, shorter haystack, discovery order.
pub fn rank(entries: Vec<FileEntry>, query: &str, limit: usize) -> Vec<FileEntry> {
    let pattern = Pattern::new(
        query,
        CaseMatching::Smart,
        Normalization::Smart,
        AtomKind::Fuzzy,
    );
    let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);
    let mut buf = Vec::new();

    let mut scored: Vec<(u32, usize, usize, FileEntry)> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(order, entry)| {
            let haystack = entry.haystack();
            let score = pattern.score(Utf32Str::new(&haystack, &mut buf), &mut matcher)?;
            Some((score, haystack.chars().count(), order, entry))
        })
        .collect();

    scored.sort_by(|a, b| match b.0.cmp(&a.0) {
        Ordering::Equal => a.1.cmp(&b.1).then(a.2.cmp(&b.2)),
        other => other,
    });
    scored.truncate(limit);
    scored.into_iter().map(|(_, _, _, entry)| entry).collect()
}

/// Correct the inferred kind from the live filesystem. A vanished path keeps its kind.
fn reverify_kind(mut entry: FileEntry, root: &Path) -> FileEntry {
    match fs::metadata(root.join(&entry.path)) {
        Ok(meta) => {
            let live = if meta.is_dir() {
                EntryKind::Folder
            } else {
                EntryKind::File
            };
            if live != entry.kind {
                tracing::debug!(path = %entry.path, ?live, "Entry kind changed on disk");
                entry.kind = live;
            }
        }
        Err(e) => {
            tracing::debug!(path = %entry.path, error = %e, "Keeping inferred kind");
        }
    }
    entry
}

fn normalize_listed(raw: &str) -> String {
    let path = raw.trim_end_matches('\r').replace('\\', "/");
    match path.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

fn is_contained_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

//! Search executors - binary discovery, bounded process runs, and the three search modes.
//!
//! Content search streams ripgrep's JSON events through [`aggregate::MatchAggregator`]
//! and renders them with [`format::ResultFormatter`]. Glob and fuzzy search run ripgrep
//! in list-files mode and post-process the listing themselves.

pub mod aggregate;
pub mod boundary;
pub mod content;
pub mod format;
pub mod fuzzy;
pub mod glob;
pub mod locator;
pub mod process;
pub mod protocol;

use std::path::{Path, PathBuf};
use std::time::Duration;

use delve_types::{FileEntry, GlobToolResult, Guarded, SearchRequest};

pub use boundary::WorkspaceBoundary;
pub use content::{ContentOptions, ContentSearch, ContentSearchOutput};
pub use format::{FormatBudget, ResultFormatter};
pub use fuzzy::{FuzzyOptions, FuzzyPathSearch};
pub use glob::{GlobOptions, GlobSearch};
pub use locator::LocatorHints;
pub use process::{EnvSanitizer, ProcessRunner, RunOptions, RunStop, RunSummary};

/// Error types for search execution.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search binary not found (searched: {})", display_paths(.searched))]
    BinaryNotFound { searched: Vec<PathBuf> },
    #[error("failed to spawn {}: {source}", .binary.display())]
    ProcessSpawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("search process exited with {}: {stderr}", display_code(.code))]
    ProcessExit { code: Option<i32>, stderr: String },
    #[error("path outside workspace (attempted: {}, resolved: {})", .attempted.display(), .resolved.display())]
    PathTraversal { attempted: PathBuf, resolved: PathBuf },
    #[error("path does not exist: {}", .path.display())]
    PathNotFound { path: PathBuf },
    #[error("invalid search request: {message}")]
    InvalidRequest { message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Everything a [`SearchService`] needs besides the workspace root.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub locator: LocatorHints,
    pub env_denylist: Vec<String>,
    pub content: ContentOptions,
    pub glob: GlobOptions,
    pub fuzzy: FuzzyOptions,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            locator: LocatorHints::default(),
            env_denylist: process::DEFAULT_ENV_DENYLIST
                .iter()
                .map(ToString::to_string)
                .collect(),
            content: ContentOptions::default(),
            glob: GlobOptions::default(),
            fuzzy: FuzzyOptions::default(),
        }
    }
}

impl SearchSettings {
    /// Apply one wall-clock timeout to every operation.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.content.timeout = timeout;
        self.glob.timeout = timeout;
        self.fuzzy.timeout = timeout;
        self
    }
}

/// Entry point for the three search operations over one workspace.
#[derive(Debug, Clone)]
pub struct SearchService {
    settings: SearchSettings,
    boundary: WorkspaceBoundary,
    env: EnvSanitizer,
}

impl SearchService {
    pub fn new(settings: SearchSettings, root: impl AsRef<Path>) -> Result<Self, SearchError> {
        let boundary = WorkspaceBoundary::new(root)?;
        let env = EnvSanitizer::new(&settings.env_denylist)?;
        tracing::debug!(root = %boundary.root().display(), "Search workspace ready");
        Ok(Self {
            settings,
            boundary,
            env,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.boundary.root()
    }

    /// Resolve the search executable.
    ///
    /// An explicit binary hint is looked up fresh each call; otherwise the process-wide
    /// cached lookup is used.
    pub fn locate_binary(&self) -> Result<PathBuf, SearchError> {
        if self.settings.locator.bundled.is_some() {
            locator::locate(&self.settings.locator)
        } else {
            locator::cached(&self.settings.locator)
        }
    }

    fn runner(&self) -> Result<ProcessRunner, SearchError> {
        Ok(ProcessRunner::new(self.locate_binary()?, self.env.clone()))
    }

    pub async fn content(&self, request: &SearchRequest) -> Result<ContentSearchOutput, SearchError> {
        let runner = self.runner()?;
        ContentSearch::new(&runner, &self.boundary, self.settings.content)
            .search(request)
            .await
    }

    pub async fn glob(
        &self,
        pattern: &str,
        path: Option<&str>,
    ) -> Result<Guarded<GlobToolResult>, SearchError> {
        let runner = self.runner()?;
        GlobSearch::new(&runner, &self.boundary, self.settings.glob.clone())
            .search(pattern, path)
            .await
    }

    /// Rank workspace paths against `query`. `limit` overrides the configured limit.
    pub async fn fuzzy(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<FileEntry>, SearchError> {
        let runner = self.runner()?;
        let mut options = self.settings.fuzzy.clone();
        if let Some(limit) = limit {
            options.limit = limit;
        }
        FuzzyPathSearch::new(&runner, &self.boundary, options)
            .search(query)
            .await
    }
}

//! Core domain types for delve.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Requests, aggregated results, path entries and the safe-error vocabulary shared by
//! the search tools and their callers all live here.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod entry;
mod request;
mod results;

pub use entry::{EntryKind, FileEntry, GlobFile, GlobMetadata, GlobToolResult, TextContent};
pub use request::SearchRequest;
pub use results::{FileResultSet, FormattedOutput, LineRecord, ResultBlock};

use thiserror::Error;

// ============================================================================
// Budgets
// ============================================================================

/// Default ceiling on result blocks rendered for one content search.
pub const MAX_RESULTS: usize = 100;

/// Default ceiling on characters in one formatted report (excluding the notice).
pub const MAX_OUTPUT_CHARS: usize = 30_000;

/// Longest line text kept per record before the truncation marker is applied.
pub const MAX_LINE_LENGTH: usize = 2_000;

/// Marker appended to line text cut at `MAX_LINE_LENGTH`.
pub const LINE_TRUNCATION_MARKER: &str = "...";

/// Assumed upper bound on protocol lines produced per logical result.
pub const LINES_PER_RESULT: usize = 5;

/// Notice appended when the character budget stops formatting.
pub const OUTPUT_TRUNCATION_NOTICE: &str =
    "\n(Output truncated: character limit reached. Use a more specific pattern or path.)\n";

/// Directories every file listing skips.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &["node_modules", "dist", "build", ".git"];

/// Line cap for a content search with the given result budget.
#[must_use]
pub const fn line_cap(max_results: usize) -> usize {
    max_results.saturating_mul(LINES_PER_RESULT)
}

// ============================================================================
// Safe Errors
// ============================================================================

/// Rejections returned (not raised) to tool-facing callers of glob and fuzzy search.
///
/// The `Display` text is the user-facing message; callers render it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafeError {
    #[error("Path \"{path}\" is outside the workspace directory")]
    OutsideWorkspace { path: String },
    #[error("Path \"{path}\" does not exist")]
    PathNotFound { path: String },
    #[error("No files found")]
    NoFilesFound,
}

/// Result of an operation whose path rejections are values rather than errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    Found(T),
    Rejected(SafeError),
}

impl<T> Guarded<T> {
    #[must_use]
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    #[must_use]
    pub fn rejection(&self) -> Option<&SafeError> {
        match self {
            Self::Found(_) => None,
            Self::Rejected(err) => Some(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Guarded<U> {
        match self {
            Self::Found(value) => Guarded::Found(f(value)),
            Self::Rejected(err) => Guarded::Rejected(err),
        }
    }
}

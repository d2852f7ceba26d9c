//! Discovery of the ripgrep executable.
//!
//! Candidates are tried in a fixed order: an explicit (bundled) path, well-known
//! package install directories, then a `PATH` scan. The first existing executable wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::SearchError;

/// Environment variable that overrides the bundled binary hint.
pub const BINARY_ENV_VAR: &str = "DELVE_RG_PATH";

#[cfg(windows)]
const BINARY_NAME: &str = "rg.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "rg";

#[derive(Debug, Clone)]
pub struct LocatorHints {
    /// Vendored binary, or a directory containing it.
    pub bundled: Option<PathBuf>,
    /// Package manager install directories, searched in order.
    pub package_dirs: Vec<PathBuf>,
    pub search_path: bool,
}

impl Default for LocatorHints {
    fn default() -> Self {
        Self {
            bundled: None,
            package_dirs: default_package_dirs(),
            search_path: true,
        }
    }
}

impl LocatorHints {
    #[must_use]
    pub fn with_bundled(mut self, bundled: Option<PathBuf>) -> Self {
        self.bundled = bundled;
        self
    }

    /// Prepend extra install directories ahead of the defaults.
    #[must_use]
    pub fn with_extra_package_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut merged: Vec<PathBuf> = dirs.into_iter().collect();
        merged.append(&mut self.package_dirs);
        self.package_dirs = merged;
        self
    }

    /// Apply `DELVE_RG_PATH`, which takes precedence over a configured bundled path.
    #[must_use]
    pub fn with_env_override(self) -> Self {
        match std::env::var_os(BINARY_ENV_VAR) {
            Some(value) if !value.is_empty() => self.with_bundled(Some(PathBuf::from(value))),
            _ => self,
        }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let mut out = Vec::with_capacity(self.package_dirs.len() + 1);
        if let Some(bundled) = &self.bundled {
            if bundled.is_dir() {
                out.push(bundled.join(BINARY_NAME));
            } else {
                out.push(bundled.clone());
            }
        }
        out.extend(self.package_dirs.iter().map(|dir| dir.join(BINARY_NAME)));
        out
    }
}

fn default_package_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(home) = dirs::home_dir() {
        dirs.push(home.join(".cargo").join("bin"));
    }
    #[cfg(unix)]
    dirs.extend(
        ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin", "/snap/bin"]
            .into_iter()
            .map(PathBuf::from),
    );
    dirs
}

/// Find the search executable. Performs stat calls only.
pub fn locate(hints: &LocatorHints) -> Result<PathBuf, SearchError> {
    let mut searched = Vec::new();
    for candidate in hints.candidates() {
        if is_executable(&candidate) {
            tracing::debug!(path = %candidate.display(), "Resolved search binary");
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    if hints.search_path {
        if let Ok(found) = which::which(BINARY_NAME) {
            tracing::debug!(path = %found.display(), "Resolved search binary from PATH");
            return Ok(found);
        }
        searched.push(PathBuf::from("$PATH"));
    }

    Err(SearchError::BinaryNotFound { searched })
}

/// Process-wide memoized [`locate`]. Only a successful lookup is cached.
pub fn cached(hints: &LocatorHints) -> Result<PathBuf, SearchError> {
    static RESOLVED: OnceLock<PathBuf> = OnceLock::new();
    if let Some(path) = RESOLVED.get() {
        return Ok(path.clone());
    }
    let path = locate(hints)?;
    Ok(RESOLVED.get_or_init(|| path).clone())
}

pub(crate) fn is_executable(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

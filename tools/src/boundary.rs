//! Workspace containment for requested search paths.
//!
//! A requested path is resolved lexically first (joining, collapsing `.` and `..`) and
//! checked against the root before anything on disk is touched. Only a path that is
//! lexically inside the workspace is stat'ed and canonicalized, and the canonical form
//! is checked again so symlinks cannot lead out.

use std::fs;
use std::path::{Component, Path, PathBuf};

use super::SearchError;

#[derive(Debug, Clone)]
pub struct WorkspaceBoundary {
    /// Canonical root.
    root: PathBuf,
    /// Root spellings accepted in the lexical check (canonical plus as given).
    aliases: Vec<PathBuf>,
}

impl WorkspaceBoundary {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SearchError> {
        let given = root.as_ref();
        let absolute = if given.is_absolute() {
            normalize_lexically(given)
        } else {
            normalize_lexically(&std::env::current_dir()?.join(given))
        };
        let canonical = fs::canonicalize(&absolute).map_err(|_| SearchError::PathNotFound {
            path: absolute.clone(),
        })?;
        if !canonical.is_dir() {
            return Err(SearchError::InvalidRequest {
                message: format!("workspace root is not a directory: {}", canonical.display()),
            });
        }
        let mut aliases = vec![canonical.clone()];
        if absolute != canonical {
            aliases.push(absolute);
        }
        Ok(Self {
            root: canonical,
            aliases,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a requested directory (absolute or root-relative; `None` is the root).
    ///
    /// Returns the canonical path. Fails with `PathTraversal` when the path leaves the
    /// workspace and `PathNotFound` when it does not exist.
    pub fn resolve(&self, requested: Option<&str>) -> Result<PathBuf, SearchError> {
        let Some(raw) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(self.root.clone());
        };
        if contains_unsafe_path_chars(raw) {
            return Err(SearchError::InvalidRequest {
                message: "path contains invalid control characters".to_string(),
            });
        }

        let input = PathBuf::from(raw);
        let joined = if input.is_absolute() {
            normalize_lexically(&input)
        } else {
            normalize_lexically(&self.root.join(&input))
        };
        let Some(alias) = self.aliases.iter().find(|a| joined.starts_with(a)) else {
            return Err(SearchError::PathTraversal {
                attempted: input,
                resolved: joined,
            });
        };
        let rebased = match joined.strip_prefix(alias) {
            Ok(rel) => self.root.join(rel),
            Err(_) => joined.clone(),
        };

        if !rebased.exists() {
            return Err(SearchError::PathNotFound { path: rebased });
        }
        let canonical = fs::canonicalize(&rebased)?;
        if !canonical.starts_with(&self.root) {
            return Err(SearchError::PathTraversal {
                attempted: input,
                resolved: canonical,
            });
        }
        Ok(canonical)
    }

    /// Whether `path` (absolute, or relative to the root) stays inside the workspace.
    ///
    /// Existing paths are canonicalized so symlinked escapes are caught.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        match fs::canonicalize(&joined) {
            Ok(canonical) => canonical.starts_with(&self.root),
            Err(_) => {
                let lexical = normalize_lexically(&joined);
                self.aliases.iter().any(|a| lexical.starts_with(a))
            }
        }
    }

    /// Root-relative display form with `/` separators.
    #[must_use]
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        Some(rel.to_string_lossy().replace('\\', "/"))
    }
}

/// Collapse `.` and `..` without touching the filesystem.
///
/// `..` above the filesystem root is dropped, matching how the OS resolves it.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn contains_unsafe_path_chars(input: &str) -> bool {
    input.chars().any(is_unsafe_path_char)
}

/// C0/C1 controls, DEL, bidi overrides and zero-width characters.
fn is_unsafe_path_char(c: char) -> bool {
    matches!(
        c,
        '\u{0000}'..='\u{001f}'
            | '\u{007f}'
            | '\u{0080}'..='\u{009f}'
            | '\u{061c}'
            | '\u{200b}'..='\u{200f}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2066}'..='\u{2069}'
            | '\u{feff}'
    )
}

#[cfg(test)]
mod tests {
    use super::{
        SearchError, WorkspaceBoundary, contains_unsafe_path_chars, is_unsafe_path_char,
        normalize_lexically,
    };
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    #[test]
    fn safe_chars_not_flagged() {
        for c in ['a', 'Z', '0', '/', '\\', '.', '-', '_', ' '] {
            assert!(!is_unsafe_path_char(c));
        }
    }

    #[test]
    fn control_and_bidi_chars_are_unsafe() {
        assert!(is_unsafe_path_char('\u{0000}'));
        assert!(is_unsafe_path_char('\u{007f}'));
        assert!(is_unsafe_path_char('\u{202e}')); // RLO
        assert!(is_unsafe_path_char('\u{200b}')); // ZWSP
        assert!(contains_unsafe_path_chars("src/ma\u{200b}in.rs"));
    }

    #[test]
    fn normalize_lexically_collapses_parent_dirs() {
        assert_eq!(
            normalize_lexically(Path::new("/ws/src/../lib/./a.rs")),
            PathBuf::from("/ws/lib/a.rs")
        );
        assert_eq!(
            normalize_lexically(Path::new("/ws/../../../etc")),
            PathBuf::from("/etc")
        );
    }

    #[test]
    fn resolve_defaults_to_root() {
        let temp = tempdir().unwrap();
        let boundary = WorkspaceBoundary::new(temp.path()).unwrap();
        assert_eq!(boundary.resolve(None).unwrap(), boundary.root());
        assert_eq!(boundary.resolve(Some("  ")).unwrap(), boundary.root());
    }

    #[test]
    fn resolve_relative_subdir() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/inner")).unwrap();
        let boundary = WorkspaceBoundary::new(temp.path()).unwrap();
        let resolved = boundary.resolve(Some("src/inner")).unwrap();
        assert_eq!(resolved, boundary.root().join("src/inner"));
        // `..` that stays inside is fine
        let back = boundary.resolve(Some("src/inner/..")).unwrap();
        assert_eq!(back, boundary.root().join("src"));
    }

    #[test]
    fn resolve_rejects_parent_escape_without_touching_disk() {
        let temp = tempdir().unwrap();
        let boundary = WorkspaceBoundary::new(temp.path()).unwrap();
        match boundary.resolve(Some("../../../etc")) {
            Err(SearchError::PathTraversal { attempted, .. }) => {
                assert_eq!(attempted, PathBuf::from("../../../etc"));
            }
            other => panic!("expected traversal, got {other:?}"),
        }
        // A sibling that does not exist is still reported as traversal, not missing.
        assert!(matches!(
            boundary.resolve(Some("../definitely-not-here-xyz")),
            Err(SearchError::PathTraversal { .. })
        ));
    }

    #[test]
    fn resolve_rejects_absolute_outside_root() {
        let temp = tempdir().unwrap();
        let other = tempdir().unwrap();
        let boundary = WorkspaceBoundary::new(temp.path()).unwrap();
        let result = boundary.resolve(other.path().to_str());
        assert!(matches!(result, Err(SearchError::PathTraversal { .. })));
    }

    #[test]
    fn resolve_accepts_absolute_inside_root() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("pkg")).unwrap();
        let boundary = WorkspaceBoundary::new(temp.path()).unwrap();
        let abs = boundary.root().join("pkg");
        assert_eq!(boundary.resolve(abs.to_str()).unwrap(), abs);
    }

    #[test]
    fn resolve_reports_missing_dir() {
        let temp = tempdir().unwrap();
        let boundary = WorkspaceBoundary::new(temp.path()).unwrap();
        assert!(matches!(
            boundary.resolve(Some("nope")),
            Err(SearchError::PathNotFound { .. })
        ));
    }

    #[test]
    fn resolve_rejects_control_chars() {
        let temp = tempdir().unwrap();
        let boundary = WorkspaceBoundary::new(temp.path()).unwrap();
        assert!(matches!(
            boundary.resolve(Some("src\u{0000}")),
            Err(SearchError::InvalidRequest { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_rejects_symlink_escape() {
        let temp = tempdir().unwrap();
        let outside = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).unwrap();
        let boundary = WorkspaceBoundary::new(temp.path()).unwrap();
        assert!(matches!(
            boundary.resolve(Some("link")),
            Err(SearchError::PathTraversal { .. })
        ));
        assert!(!boundary.contains(Path::new("link")));
    }

    #[test]
    fn new_fails_for_missing_root() {
        let temp = tempdir().unwrap();
        assert!(matches!(
            WorkspaceBoundary::new(temp.path().join("missing")),
            Err(SearchError::PathNotFound { .. })
        ));
    }

    #[test]
    fn relative_strips_root() {
        let temp = tempdir().unwrap();
        let boundary = WorkspaceBoundary::new(temp.path()).unwrap();
        let path = boundary.root().join("a").join("b.rs");
        assert_eq!(boundary.relative(&path).as_deref(), Some("a/b.rs"));
    }
}

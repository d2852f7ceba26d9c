//! Path listing types for glob and fuzzy search.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// A workspace-relative path returned by fuzzy search.
///
/// Folders never come from the underlying listing; they are inferred from file parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FileEntry {
    #[must_use]
    pub fn file(path: impl Into<String>) -> Self {
        Self::labelled(path.into(), EntryKind::File)
    }

    #[must_use]
    pub fn folder(path: impl Into<String>) -> Self {
        Self::labelled(path.into(), EntryKind::Folder)
    }

    fn labelled(path: String, kind: EntryKind) -> Self {
        let label = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        Self { path, kind, label }
    }

    /// The string fuzzy ranking scores against.
    #[must_use]
    pub fn haystack(&self) -> String {
        match &self.label {
            Some(label) => format!("{} {label}", self.path),
            None => self.path.clone(),
        }
    }
}

/// One glob match with its modification time in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobFile {
    pub path: String,
    pub basename: String,
    pub mtime: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobMetadata {
    pub files: Vec<GlobFile>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TextContent {
    Text { text: String },
}

/// Tool-facing glob result: display text plus structured metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobToolResult {
    pub content: Vec<TextContent>,
    #[serde(default)]
    pub metadata: GlobMetadata,
}

impl GlobToolResult {
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                TextContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

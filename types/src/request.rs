//! Content search request as received from the tool layer.

use serde::{Deserialize, Serialize};

/// A single content search. Built once per call and never mutated afterwards.
///
/// The serialized form matches the tool-layer JSON shape:
/// `{ pattern, path?, filePattern?, maxResults?, context?, caseSensitive?,
/// fixedStrings?, invertMatch?, wordMatch? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchRequest {
    pub pattern: String,
    /// Directory to search, absolute or relative to the workspace root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Only search files whose path matches this glob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    /// Lines of context before and after each match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<u32>,
    /// `None` is smart case: sensitive only when the pattern has uppercase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub fixed_strings: bool,
    #[serde(default)]
    pub invert_match: bool,
    #[serde(default)]
    pub word_match: bool,
}

impl SearchRequest {
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            path: None,
            file_pattern: None,
            max_results: None,
            context: None,
            case_sensitive: None,
            fixed_strings: false,
            invert_match: false,
            word_match: false,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_file_pattern(mut self, glob: impl Into<String>) -> Self {
        self.file_pattern = Some(glob.into());
        self
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    #[must_use]
    pub fn with_context(mut self, lines: u32) -> Self {
        self.context = Some(lines);
        self
    }

    #[must_use]
    pub fn with_case_sensitive(mut self, sensitive: bool) -> Self {
        self.case_sensitive = Some(sensitive);
        self
    }

    #[must_use]
    pub fn with_fixed_strings(mut self, fixed: bool) -> Self {
        self.fixed_strings = fixed;
        self
    }

    #[must_use]
    pub fn with_invert_match(mut self, invert: bool) -> Self {
        self.invert_match = invert;
        self
    }

    #[must_use]
    pub fn with_word_match(mut self, word: bool) -> Self {
        self.word_match = word;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::SearchRequest;
    use serde_json::json;

    #[test]
    fn deserializes_tool_layer_shape() {
        let raw = json!({
            "pattern": "TODO",
            "path": "src",
            "filePattern": "*.rs",
            "maxResults": 10,
            "context": 2,
            "caseSensitive": true,
            "fixedStrings": true,
            "invertMatch": false,
            "wordMatch": true
        });
        let req: SearchRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(req.pattern, "TODO");
        assert_eq!(req.path.as_deref(), Some("src"));
        assert_eq!(req.file_pattern.as_deref(), Some("*.rs"));
        assert_eq!(req.max_results, Some(10));
        assert_eq!(req.context, Some(2));
        assert_eq!(req.case_sensitive, Some(true));
        assert!(req.fixed_strings);
        assert!(!req.invert_match);
        assert!(req.word_match);
    }

    #[test]
    fn deserializes_minimal_request() {
        let req: SearchRequest = serde_json::from_value(json!({"pattern": "x"})).unwrap();
        assert_eq!(req, SearchRequest::new("x"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<SearchRequest, _> =
            serde_json::from_value(json!({"pattern": "x", "regex": true}));
        assert!(result.is_err());
    }
}

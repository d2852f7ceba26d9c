//! Aggregated content search results.

use serde::{Deserialize, Serialize};

/// One matched or context line of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    pub line_number: u64,
    pub text: String,
    pub is_match: bool,
    /// 1-based byte column of the first submatch, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
}

impl LineRecord {
    #[must_use]
    pub fn matched(line_number: u64, text: impl Into<String>, column: Option<u64>) -> Self {
        Self {
            line_number,
            text: text.into(),
            is_match: true,
            column,
        }
    }

    #[must_use]
    pub fn context(line_number: u64, text: impl Into<String>) -> Self {
        Self {
            line_number,
            text: text.into(),
            is_match: false,
            column: None,
        }
    }
}

/// A maximal run of lines where each line number is at most one past its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultBlock {
    lines: Vec<LineRecord>,
}

impl ResultBlock {
    #[must_use]
    pub fn start(first: LineRecord) -> Self {
        Self { lines: vec![first] }
    }

    /// Whether `line_number` belongs in this block (contiguous or overlapping).
    #[must_use]
    pub fn continues_with(&self, line_number: u64) -> bool {
        self.lines
            .last()
            .is_some_and(|last| last.line_number.saturating_add(1) >= line_number)
    }

    fn push(&mut self, line: LineRecord) {
        self.lines.push(line);
    }

    #[must_use]
    pub fn lines(&self) -> &[LineRecord] {
        &self.lines
    }

    #[must_use]
    pub fn first_line(&self) -> u64 {
        self.lines.first().map_or(0, |l| l.line_number)
    }

    #[must_use]
    pub fn last_line(&self) -> u64 {
        self.lines.last().map_or(0, |l| l.line_number)
    }

    #[must_use]
    pub fn match_count(&self) -> usize {
        self.lines.iter().filter(|l| l.is_match).count()
    }
}

/// All blocks produced for one file, in parse order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResultSet {
    pub path: String,
    blocks: Vec<ResultBlock>,
}

impl FileResultSet {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            blocks: Vec::new(),
        }
    }

    /// Append a line, extending the last block when it is contiguous.
    pub fn push_line(&mut self, line: LineRecord) {
        match self.blocks.last_mut() {
            Some(block) if block.continues_with(line.line_number) => block.push(line),
            _ => self.blocks.push(ResultBlock::start(line)),
        }
    }

    #[must_use]
    pub fn blocks(&self) -> &[ResultBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// The rendered report for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedOutput {
    text: String,
    truncated: bool,
}

impl FormattedOutput {
    #[must_use]
    pub fn new(text: String, truncated: bool) -> Self {
        Self { text, truncated }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

//! Budgeted text rendering of aggregated results.
//!
//! Output grammar:
//!
//! ```text
//! Found 2 results.
//!
//! # src/a.rs
//! 12 | // TODO: split this
//! ----
//!
//! # src/b.rs
//! 3 | TODO
//! ----
//! ```

use std::path::Path;

use delve_types::{
    FileResultSet, FormattedOutput, MAX_OUTPUT_CHARS, MAX_RESULTS, OUTPUT_TRUNCATION_NOTICE,
};

const BLOCK_SEPARATOR: &str = "----\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatBudget {
    /// Result blocks rendered across all files.
    pub max_results: usize,
    /// Characters rendered before the truncation notice.
    pub max_output_chars: usize,
}

impl Default for FormatBudget {
    fn default() -> Self {
        Self {
            max_results: MAX_RESULTS,
            max_output_chars: MAX_OUTPUT_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultFormatter {
    budget: FormatBudget,
}

impl ResultFormatter {
    #[must_use]
    pub fn new(budget: FormatBudget) -> Self {
        Self { budget }
    }

    /// Render `files` in discovery order.
    ///
    /// `limit_reached` reports that the producer stopped early (line cap or timeout), so
    /// more results may exist than were aggregated.
    #[must_use]
    pub fn format(
        &self,
        files: &[FileResultSet],
        working_dir: &Path,
        limit_reached: bool,
    ) -> FormattedOutput {
        let total: usize = files.iter().map(|f| f.blocks().len()).sum();
        let over_budget = limit_reached || total > self.budget.max_results;
        let shown = total.min(self.budget.max_results);

        let mut out = BudgetedText::new(self.budget.max_output_chars);
        let header = if over_budget {
            format!("Found first {shown} of {shown}+ results.\n\n")
        } else if total == 1 {
            "Found 1 result.\n\n".to_string()
        } else {
            format!("Found {total} results.\n\n")
        };

        if out.push(&header) {
            let mut remaining = shown;
            'files: for file in files {
                if remaining == 0 {
                    break;
                }
                if file.is_empty() {
                    continue;
                }
                let display = display_path(&file.path, working_dir);
                if !out.push(&format!("# {display}\n")) {
                    break;
                }
                for block in file.blocks() {
                    if remaining == 0 {
                        break;
                    }
                    for line in block.lines() {
                        if !out.push(&format!("{} | {}\n", line.line_number, line.text)) {
                            break 'files;
                        }
                    }
                    if !out.push(BLOCK_SEPARATOR) {
                        break 'files;
                    }
                    remaining -= 1;
                }
                if !out.push("\n") {
                    break;
                }
            }
        }

        let exhausted = out.exhausted;
        let mut text = out.text;
        if exhausted {
            text.push_str(OUTPUT_TRUNCATION_NOTICE);
        }
        FormattedOutput::new(text, over_budget || exhausted)
    }
}

/// A string that refuses appends past a character budget.
struct BudgetedText {
    text: String,
    chars: usize,
    max_chars: usize,
    exhausted: bool,
}

impl BudgetedText {
    fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            max_chars,
            exhausted: false,
        }
    }

    fn push(&mut self, piece: &str) -> bool {
        if self.exhausted {
            return false;
        }
        let len = piece.chars().count();
        if self.chars + len > self.max_chars {
            self.exhausted = true;
            return false;
        }
        self.text.push_str(piece);
        self.chars += len;
        true
    }
}

fn display_path(path: &str, working_dir: &Path) -> String {
    let p = Path::new(path);
    let rel = if p.is_absolute() {
        p.strip_prefix(working_dir).unwrap_or(p)
    } else {
        p
    };
    rel.to_string_lossy().replace('\\', "/")
}

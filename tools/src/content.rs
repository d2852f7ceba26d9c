//! Regex/literal content search: spawn, stream, aggregate, format.

use std::time::Duration;

use delve_types::{MAX_LINE_LENGTH, MAX_OUTPUT_CHARS, MAX_RESULTS, SearchRequest, line_cap};
use serde::Serialize;

use super::SearchError;
use super::aggregate::MatchAggregator;
use super::boundary::WorkspaceBoundary;
use super::format::{FormatBudget, ResultFormatter};
use super::process::{ProcessRunner, RunOptions};

#[derive(Debug, Clone, Copy)]
pub struct ContentOptions {
    /// Used when the request does not set `maxResults`.
    pub max_results: usize,
    pub max_output_chars: usize,
    pub max_line_length: usize,
    pub timeout: Option<Duration>,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            max_results: MAX_RESULTS,
            max_output_chars: MAX_OUTPUT_CHARS,
            max_line_length: MAX_LINE_LENGTH,
            timeout: None,
        }
    }
}

/// Rendered report plus the numbers behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentSearchOutput {
    pub output: String,
    /// Files with at least one result block.
    pub files: usize,
    /// Result blocks aggregated, before the result budget is applied.
    pub results: usize,
    /// The line cap or timeout stopped the search, or a budget cut the report.
    pub limit_reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

pub struct ContentSearch<'a> {
    runner: &'a ProcessRunner,
    boundary: &'a WorkspaceBoundary,
    options: ContentOptions,
}

impl<'a> ContentSearch<'a> {
    #[must_use]
    pub fn new(
        runner: &'a ProcessRunner,
        boundary: &'a WorkspaceBoundary,
        options: ContentOptions,
    ) -> Self {
        Self {
            runner,
            boundary,
            options,
        }
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<ContentSearchOutput, SearchError> {
        if request.pattern.is_empty() {
            return Err(SearchError::InvalidRequest {
                message: "pattern must not be empty".to_string(),
            });
        }
        let max_results = request.max_results.unwrap_or(self.options.max_results);
        if max_results == 0 {
            return Err(SearchError::InvalidRequest {
                message: "maxResults must be at least 1".to_string(),
            });
        }

        let target = self.boundary.resolve(request.path.as_deref())?;
        let target = self
            .boundary
            .relative(&target)
            .filter(|rel| !rel.is_empty())
            .unwrap_or_else(|| ".".to_string());

        let args = build_args(request, &target);
        tracing::debug!(?args, "Running content search");

        let run = RunOptions::new(line_cap(max_results))
            .in_dir(self.boundary.root())
            .with_timeout(self.options.timeout);
        let mut aggregator = MatchAggregator::new(self.options.max_line_length);
        let summary = self
            .runner
            .stream(&args, &run, |line| aggregator.push_line(line))
            .await?;
        let aggregation = aggregator.finish();

        let formatter = ResultFormatter::new(FormatBudget {
            max_results,
            max_output_chars: self.options.max_output_chars,
        });
        let formatted = formatter.format(
            &aggregation.files,
            self.boundary.root(),
            summary.stopped_early(),
        );
        tracing::debug!(
            files = aggregation.files.len(),
            results = aggregation.block_count(),
            warnings = aggregation.warnings,
            stop = ?summary.stop,
            "Content search finished"
        );

        Ok(ContentSearchOutput {
            files: aggregation.files.iter().filter(|f| !f.is_empty()).count(),
            results: aggregation.block_count(),
            limit_reached: formatted.truncated(),
            diagnostic: summary.diagnostic,
            output: formatted.into_text(),
        })
    }
}

/// Argument vector for a JSON-mode search. The pattern always follows `--`.
pub fn build_args(request: &SearchRequest, target: &str) -> Vec<String> {
    let mut args: Vec<String> = ["--json", "--no-config", "--line-number"]
        .into_iter()
        .map(String::from)
        .collect();

    args.push(
        match request.case_sensitive {
            Some(true) => "--case-sensitive",
            Some(false) => "--ignore-case",
            None => "--smart-case",
        }
        .to_string(),
    );
    if request.fixed_strings {
        args.push("--fixed-strings".to_string());
    }
    if request.invert_match {
        args.push("--invert-match".to_string());
    }
    if request.word_match {
        args.push("--word-regexp".to_string());
    }
    if let Some(context) = request.context.filter(|c| *c > 0) {
        args.push("--context".to_string());
        args.push(context.to_string());
    }
    if let Some(glob) = request
        .file_pattern
        .as_deref()
        .filter(|g| !g.trim().is_empty())
    {
        args.push("--glob".to_string());
        args.push(glob.to_string());
    }

    args.push("--".to_string());
    args.push(request.pattern.clone());
    args.push(target.to_string());
    args
}

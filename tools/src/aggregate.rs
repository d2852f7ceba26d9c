//! Groups streamed search events into per-file result blocks.

use delve_types::{FileResultSet, LINE_TRUNCATION_MARKER, LineRecord};

use super::protocol::{LineData, ParseWarning, SearchEvent, parse_event};

/// Output of a finished aggregation.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub files: Vec<FileResultSet>,
    /// Protocol lines that were dropped.
    pub warnings: usize,
}

impl Aggregation {
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.files.iter().map(|f| f.blocks().len()).sum()
    }
}

/// Incremental consumer of the event stream.
///
/// Holds at most one open file. `Begin` opens it, `End` moves it to the output, and
/// match/context lines in between are appended. A file still open when the stream
/// stops (the child was killed mid-file) never produced its `End` and is not emitted.
#[derive(Debug)]
pub struct MatchAggregator {
    current: Option<FileResultSet>,
    files: Vec<FileResultSet>,
    max_line_length: usize,
    warnings: usize,
}

impl MatchAggregator {
    #[must_use]
    pub fn new(max_line_length: usize) -> Self {
        Self {
            current: None,
            files: Vec::new(),
            max_line_length,
            warnings: 0,
        }
    }

    /// Parse and apply one raw protocol line. Malformed lines are logged and skipped.
    pub fn push_line(&mut self, line: &str) {
        match parse_event(line) {
            Ok(event) => self.push_event(event),
            Err(warning) => self.warn(&warning),
        }
    }

    pub fn push_event(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::Begin(data) => {
                let path = normalize_path_text(&data.path.to_string_lossy());
                if let Some(open) = self.current.replace(FileResultSet::new(path)) {
                    self.warn(&ParseWarning {
                        message: format!("begin for a new file while {} was open", open.path),
                    });
                }
            }
            SearchEvent::Match(data) => self.push_record(data, true),
            SearchEvent::Context(data) => self.push_record(data, false),
            SearchEvent::End(_) => match self.current.take() {
                Some(done) => self.files.push(done),
                None => self.warn(&ParseWarning {
                    message: "end without a matching begin".to_string(),
                }),
            },
            SearchEvent::Summary(_) => {}
        }
    }

    fn push_record(&mut self, data: LineData, is_match: bool) {
        let Some(line_number) = data.line_number else {
            self.warn(&ParseWarning {
                message: "line event without a line number".to_string(),
            });
            return;
        };
        let Some(current) = self.current.as_mut() else {
            self.warn(&ParseWarning {
                message: "line event outside of a begin/end pair".to_string(),
            });
            return;
        };
        let raw = data.lines.to_string_lossy();
        let text = truncate_line(trim_line_endings(&raw), self.max_line_length);
        let record = if is_match {
            LineRecord::matched(line_number, text, data.column())
        } else {
            LineRecord::context(line_number, text)
        };
        current.push_line(record);
    }

    fn warn(&mut self, warning: &ParseWarning) {
        self.warnings += 1;
        tracing::warn!(%warning, "Skipping search output line");
    }

    #[must_use]
    pub fn finish(self) -> Aggregation {
        if let Some(open) = &self.current {
            tracing::debug!(path = %open.path, "Dropping file without end event");
        }
        Aggregation {
            files: self.files,
            warnings: self.warnings,
        }
    }
}

/// Aggregate an already-parsed event sequence.
pub fn aggregate<I>(events: I, max_line_length: usize) -> Vec<FileResultSet>
where
    I: IntoIterator<Item = SearchEvent>,
{
    let mut aggregator = MatchAggregator::new(max_line_length);
    for event in events {
        aggregator.push_event(event);
    }
    aggregator.finish().files
}

fn trim_line_endings(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Cut `text` to `max_chars` characters, marking the cut.
fn truncate_line(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + LINE_TRUNCATION_MARKER.len());
            out.push_str(&text[..cut]);
            out.push_str(LINE_TRUNCATION_MARKER);
            out
        }
        None => text.to_string(),
    }
}

fn normalize_path_text(path: &str) -> String {
    let path = path.replace('\\', "/");
    match path.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

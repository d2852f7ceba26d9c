//! Typed view of ripgrep's `--json` event stream.
//!
//! One JSON object per stdout line, tagged by `type` with the payload under `data`.
//! Anything that does not deserialize into [`SearchEvent`] (including unknown tags) is a
//! [`ParseWarning`] and is dropped by the caller.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::de::IgnoredAny;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SearchEvent {
    Begin(FileData),
    Match(LineData),
    Context(LineData),
    End(FileData),
    /// Trailing run statistics; carries nothing we render.
    Summary(IgnoredAny),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileData {
    pub path: ArbitraryData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineData {
    pub path: ArbitraryData,
    pub lines: ArbitraryData,
    pub line_number: Option<u64>,
    #[serde(default)]
    pub absolute_offset: u64,
    #[serde(default)]
    pub submatches: Vec<Submatch>,
}

impl LineData {
    /// 1-based byte column of the first submatch.
    #[must_use]
    pub fn column(&self) -> Option<u64> {
        self.submatches.first().map(|m| m.start as u64 + 1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Submatch {
    pub start: usize,
    pub end: usize,
}

/// Text that ripgrep emits as UTF-8 `text`, or base64 `bytes` when it is not valid UTF-8.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArbitraryData {
    Text { text: String },
    Bytes { bytes: String },
}

impl ArbitraryData {
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match self {
            Self::Text { text } => Cow::Borrowed(text),
            Self::Bytes { bytes } => match STANDARD.decode(bytes) {
                Ok(raw) => Cow::Owned(String::from_utf8_lossy(&raw).into_owned()),
                Err(_) => Cow::Borrowed(bytes),
            },
        }
    }
}

/// One protocol line that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparseable search event: {message}")]
pub struct ParseWarning {
    pub message: String,
}

pub fn parse_event(line: &str) -> Result<SearchEvent, ParseWarning> {
    serde_json::from_str(line).map_err(|e| ParseWarning {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{ArbitraryData, SearchEvent, parse_event};

    #[test]
    fn parses_begin_match_context_end() {
        let begin = parse_event(r#"{"type":"begin","data":{"path":{"text":"src/a.rs"}}}"#);
        assert!(matches!(begin, Ok(SearchEvent::Begin(ref d)) if d.path.to_string_lossy() == "src/a.rs"));

        let m = parse_event(
            r#"{"type":"match","data":{"path":{"text":"src/a.rs"},"lines":{"text":"let x = foo();\n"},"line_number":7,"absolute_offset":120,"submatches":[{"match":{"text":"foo"},"start":8,"end":11}]}}"#,
        )
        .unwrap();
        let SearchEvent::Match(data) = m else {
            panic!("expected match");
        };
        assert_eq!(data.line_number, Some(7));
        assert_eq!(data.absolute_offset, 120);
        assert_eq!(data.column(), Some(9));
        assert_eq!(data.lines.to_string_lossy(), "let x = foo();\n");

        let ctx = parse_event(
            r#"{"type":"context","data":{"path":{"text":"src/a.rs"},"lines":{"text":"}\n"},"line_number":8,"absolute_offset":135,"submatches":[]}}"#,
        )
        .unwrap();
        assert!(matches!(ctx, SearchEvent::Context(ref d) if d.column().is_none()));

        let end = parse_event(
            r#"{"type":"end","data":{"path":{"text":"src/a.rs"},"binary_offset":null,"stats":{"matches":1}}}"#,
        );
        assert!(matches!(end, Ok(SearchEvent::End(_))));
    }

    #[test]
    fn summary_is_a_known_event() {
        let summary = parse_event(
            r#"{"type":"summary","data":{"elapsed_total":{"secs":0,"nanos":1},"stats":{}}}"#,
        );
        assert!(matches!(summary, Ok(SearchEvent::Summary(_))));
    }

    #[test]
    fn unknown_tag_is_a_warning() {
        let err = parse_event(r#"{"type":"progress","data":{}}"#).unwrap_err();
        assert!(err.message.contains("unknown variant"));
    }

    #[test]
    fn malformed_json_is_a_warning() {
        assert!(parse_event("{not json").is_err());
        assert!(parse_event(r#"{"type":"match","data":{"path":{"text":"a"}}}"#).is_err());
    }

    #[test]
    fn bytes_payload_is_decoded_lossily() {
        // "caf\xff" in base64
        let data = ArbitraryData::Bytes {
            bytes: "Y2Fm/w==".to_string(),
        };
        assert_eq!(data.to_string_lossy(), "caf\u{FFFD}");
    }
}

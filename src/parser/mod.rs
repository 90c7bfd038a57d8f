//! # Record Grammar (Parser)
//!
//! Turns the raw text of an `errpt -a` report into an ordered [`Document`]
//! of [`Record`]s.
//!
//! Parsing is all-or-nothing per source: either every record in the input
//! parses, or the whole call fails with a [`ParseError`] carrying the byte
//! offset and line number of the failure. No partial document is returned
//! and no field is ever invented or dropped to make parsing succeed:
//! duplicate-looking or truncated sources must surface as errors, not as
//! silently shortened histories.
//!
//! Grammar details live in [`grammar`]; this module owns the public entry
//! point and the conversion of nom failures into positioned errors.
//!
//! ## Usage
//!
//! ```
//! use errpt_json::parser::ReportParser;
//!
//! let raw = "LABEL: DISK_ERR4\nNode Id: host1\nDescription\nDISK OPERATION ERROR";
//! let document = ReportParser::new().parse(raw).unwrap();
//! assert_eq!(document.len(), 1);
//! ```

pub mod grammar;

use nom::error::{VerboseError, VerboseErrorKind};
use thiserror::Error;
use tracing::{debug, trace};

use crate::model::{Document, Record};

/// Error type for parse failures, carrying the position of the failure
/// within the source text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Input that cannot be read as a record at the reported position.
    #[error("malformed report at line {line}, byte {offset}: expected {expected}")]
    Malformed {
        expected: String,
        offset: usize,
        line: usize,
    },
    /// Content left over after the last record and its optional trailer.
    #[error("trailing content at line {line}, byte {offset} after {records} record(s)")]
    TrailingInput {
        offset: usize,
        line: usize,
        records: usize,
    },
    /// No records could be extracted at all.
    #[error("no records found in input")]
    NoRecords,
}

impl ParseError {
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::Malformed { offset, .. } | ParseError::TrailingInput { offset, .. } => {
                Some(*offset)
            }
            ParseError::NoRecords => None,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Malformed { line, .. } | ParseError::TrailingInput { line, .. } => {
                Some(*line)
            }
            ParseError::NoRecords => None,
        }
    }
}

/// Parser for `errpt -a` report text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportParser;

impl ReportParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses a whole report into a [`Document`].
    ///
    /// The entire input must be consumed; a trailing separator and blank
    /// lines are the only tolerated trailer.
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = input.len()))]
    pub fn parse(&self, input: &str) -> Result<Document, ParseError> {
        if input.trim().is_empty() {
            return Err(ParseError::NoRecords);
        }

        let mut records: Vec<Record> = Vec::new();
        let mut rest = input;
        loop {
            if !records.is_empty() && grammar::trailer(rest).is_ok() {
                break;
            }
            match grammar::record(rest) {
                Ok((after, record)) => {
                    trace!(fields = record.len(), "parsed record");
                    records.push(record);
                    rest = after;
                }
                Err(err) => return Err(positioned_error(input, rest, records.len(), err)),
            }
        }
        debug!(records = records.len(), "parsed report");
        Ok(Document::new(records))
    }
}

/// Converts a nom failure into a [`ParseError`] with byte and line position.
fn positioned_error(
    input: &str,
    rest: &str,
    records: usize,
    err: nom::Err<VerboseError<&str>>,
) -> ParseError {
    let (failed_at, expected) = match &err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let failed_at = e.errors.first().map_or(rest, |(i, _)| *i);
            let contexts: Vec<&str> = e
                .errors
                .iter()
                .filter_map(|(_, kind)| match kind {
                    VerboseErrorKind::Context(c) => Some(*c),
                    _ => None,
                })
                .collect();
            let expected = if contexts.is_empty() {
                "a record".to_string()
            } else {
                contexts.join(" in ")
            };
            (failed_at, expected)
        }
        nom::Err::Incomplete(_) => (rest, "more input".to_string()),
    };
    let offset = input.len() - failed_at.len();
    let line = input[..offset].bytes().filter(|b| *b == b'\n').count() + 1;
    // If nothing of a further record matched (the failure sits on the first
    // significant character of the remainder), the leftover is trailing
    // garbage rather than a malformed record.
    let remainder_start = input.len() - rest.len() + leading_blank_len(rest);
    if records > 0 && offset <= remainder_start {
        ParseError::TrailingInput {
            offset,
            line,
            records,
        }
    } else {
        ParseError::Malformed {
            expected,
            offset,
            line,
        }
    }
}

fn leading_blank_len(rest: &str) -> usize {
    rest.len() - rest.trim_start().len()
}

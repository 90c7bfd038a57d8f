//! Normalized `Date/Time` handling.
//!
//! `errpt -a` prints record timestamps as a fixed human-readable string,
//! e.g. `Wed Oct  6 13:27:04 GMT+02:00 2021`. Sorting by that string is
//! fragile, so the aggregator parses it into a [`ReportTimestamp`] at the
//! model boundary: a normalized [`NaiveDateTime`] for ordering, with the
//! original string retained for display and serialization.

use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The fixed timestamp grammar: weekday, month, day-of-month, `HH:MM:SS`,
/// offset token, 4-digit year.
///
/// The offset is a single hard-coded literal, matching the source report
/// format; reports from a machine in another zone will not parse until this
/// is generalized.
pub const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S GMT+02:00 %Y";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimestampError {
    #[error("timestamp {value:?} does not match `{TIMESTAMP_FORMAT}`: {source}")]
    Invalid {
        value: String,
        source: chrono::ParseError,
    },
}

/// A parsed `Date/Time` value that keeps its original textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTimestamp {
    raw: String,
    parsed: NaiveDateTime,
}

impl ReportTimestamp {
    pub fn parsed(&self) -> NaiveDateTime {
        self.parsed
    }

    /// The original report string, unmodified.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl FromStr for ReportTimestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).map_err(|source| {
            TimestampError::Invalid {
                value: s.to_string(),
                source,
            }
        })?;
        Ok(Self {
            raw: s.to_string(),
            parsed,
        })
    }
}

impl fmt::Display for ReportTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialOrd for ReportTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReportTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parsed.cmp(&other.parsed)
    }
}

//! # errpt-json
//!
//! Converts the textual output of AIX `errpt -a`, a sequence of
//! dash-delimited records each describing one hardware or software error
//! event, into a structured JSON document, and merges documents parsed
//! from multiple sources into one deduplicated, chronologically ordered
//! history.
//!
//! ## Pipeline
//!
//! ```text
//! raw text → parser → Document → (across sources) → aggregator → serializer → JSON
//! ```
//!
//! * [`parser`]: the record grammar, 75-dash separators, `key: value`
//!   header lines, component-identity (VPD) sub-blocks, and the free-form
//!   `Description` tail. All-or-nothing per source, with positioned errors.
//! * [`model`]: [`Record`]/[`Document`] value types with order-preserving
//!   fields and the identity key used for deduplication.
//! * [`aggregator`]: first-seen-wins dedup and `Date/Time` sort over any
//!   number of parsed documents plus an optional persisted base.
//! * [`serializer`]: the `"Errpt Records"` JSON envelope, both directions.
//! * [`batch`]: many-source parsing under a caller-chosen error policy.
//! * [`timestamp`]: the fixed `Date/Time` grammar, normalized for sorting.
//! * [`config`]: serde-backed tool configuration.
//!
//! The core is a pure, synchronous transform: nothing blocks on IO and no
//! state is shared. Reading files and writing output belong to the caller
//! (see the `errpt2json` binary).
//!
//! ## Example
//!
//! ```
//! use errpt_json::{aggregator, parse_report, serializer};
//!
//! let raw = "LABEL: DISK_ERR4\n\
//!            Date/Time: Wed Oct  6 13:27:04 GMT+02:00 2021\n\
//!            Node Id: host1\n\
//!            Description\n\
//!            DISK OPERATION ERROR";
//! let document = parse_report(raw)?;
//! let merged = aggregator::merge(None, &[document])?;
//! let json = serializer::to_json(&merged, true)?;
//! assert!(json.contains("Errpt Records"));
//! # Ok::<(), errpt_json::Error>(())
//! ```

pub mod aggregator;
pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod serializer;
pub mod timestamp;

pub use aggregator::AggregationError;
pub use error::{Error, Result};
pub use model::{Document, FieldValue, IdentityKey, Record};
pub use parser::{ParseError, ReportParser};

/// Parses one raw `errpt -a` report into a [`Document`].
pub fn parse_report(input: &str) -> std::result::Result<Document, ParseError> {
    ReportParser::new().parse(input)
}

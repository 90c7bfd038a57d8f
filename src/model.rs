//! # Record / Document Model
//!
//! Value types produced by the parser and consumed by the aggregator.
//!
//! An `errpt -a` report is a sequence of records. Each record is an ordered
//! mapping from field name to [`FieldValue`]: a plain string, a nested
//! component-identity sub-block (VPD), or the free-form multi-line
//! `Description` blob. Field order follows the source text, and the
//! `Description` field, when present, is always last.
//!
//! The model performs no validation of its own; it trusts the parser, which
//! is the only producer. A [`Document`] is immutable once parsed; the
//! aggregator builds new documents out of cloned records rather than
//! mutating anything in place.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// Name of the reserved free-form field.
pub const DESCRIPTION_FIELD: &str = "Description";

/// Header fields making up a record's identity.
pub const LABEL_FIELD: &str = "LABEL";
pub const DATE_TIME_FIELD: &str = "Date/Time";
pub const NODE_ID_FIELD: &str = "Node Id";

/// A single field value inside a [`Record`].
///
/// The original report format is stringly typed; the tagged enum makes the
/// three shapes a value can take explicit instead of relying on a dynamic
/// result structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A plain header value, trimmed of surrounding whitespace.
    Text(String),
    /// A component-identity (VPD) sub-block: ordered key/value pairs.
    SubBlock(Vec<(String, String)>),
    /// The multi-line description blob, preserved verbatim.
    Description(String),
}

impl FieldValue {
    /// Returns the plain string form of this value, if it has one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Description(s) => Some(s),
            FieldValue::SubBlock(_) => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) | FieldValue::Description(s) => serializer.serialize_str(s),
            FieldValue::SubBlock(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (key, value) in pairs {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// One error-report entry: an ordered mapping from field name to value.
///
/// Insertion order matches the order of appearance in the source text.
/// Field names are unique; inserting an existing name overwrites the value
/// while keeping the original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, preserving first-insertion position on duplicates.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Looks up a field by exact name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The plain-string value of a header field, if present.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// The raw `Date/Time` header value, if present.
    pub fn date_time(&self) -> Option<&str> {
        self.text(DATE_TIME_FIELD)
    }

    /// Extracts the identity key used for deduplication across sources.
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            label: self.text(LABEL_FIELD).map(str::to_string),
            date_time: self.date_time().map(str::to_string),
            node_id: self.text(NODE_ID_FIELD).map(str::to_string),
            description: self.text(DESCRIPTION_FIELD).map(str::to_string),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// The 4-tuple identifying a record for deduplication.
///
/// Components are compared as exact strings; a missing field compares equal
/// only to another missing field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub label: Option<String>,
    pub date_time: Option<String>,
    pub node_id: Option<String>,
    pub description: Option<String>,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |v: &Option<String>| -> String {
            v.as_deref().map_or_else(|| "<absent>".to_string(), |s| {
                // keep multi-line descriptions readable in error messages
                let first = s.lines().next().unwrap_or("");
                first.to_string()
            })
        };
        write!(
            f,
            "(label: {}, date/time: {}, node: {}, description: {})",
            part(&self.label),
            part(&self.date_time),
            part(&self.node_id),
            part(&self.description)
        )
    }
}

/// An ordered sequence of records: one parsed source, or a merged history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    records: Vec<Record>,
}

impl Document {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl IntoIterator for Document {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

//! # Aggregator
//!
//! Merges documents parsed from multiple sources (optionally on top of a
//! previously persisted base document) into one deduplicated,
//! chronologically ordered document.
//!
//! Records are identical when their [`IdentityKey`]s match; the first
//! occurrence in the flattened base-then-incoming sequence wins and later
//! duplicates are discarded. That is the point of the merge: overlapping
//! captures of the same error history collapse to one record each, and the
//! policy is first-seen-wins, never last-seen-wins.
//!
//! Sorting uses the normalized [`ReportTimestamp`] parsed from each
//! record's `Date/Time` field. A record with a missing or unparsable
//! `Date/Time` fails the whole merge; records are never silently dropped
//! and the output is never left partially sorted.

use std::collections::HashSet;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::model::{Document, IdentityKey, Record};
use crate::timestamp::{ReportTimestamp, TimestampError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("record {key} has no Date/Time field")]
    MissingTimestamp { key: IdentityKey },
    #[error("record {key} has an unparsable Date/Time: {source}")]
    InvalidTimestamp {
        key: IdentityKey,
        source: TimestampError,
    },
}

/// Merges `base` (if any) and `incoming` into one document.
///
/// Flattens base records followed by all incoming documents' records in
/// order, deduplicates first-seen-wins by identity key, then sorts
/// ascending by parsed `Date/Time`. The inputs are never mutated; the
/// result is built from cloned records.
#[tracing::instrument(level = "debug", skip_all, fields(incoming = incoming.len()))]
pub fn merge(
    base: Option<&Document>,
    incoming: &[Document],
) -> Result<Document, AggregationError> {
    let flattened = base
        .into_iter()
        .chain(incoming.iter())
        .flat_map(|document| document.records().iter());

    let mut seen: HashSet<IdentityKey> = HashSet::new();
    let mut keyed: Vec<(ReportTimestamp, Record)> = Vec::new();
    let mut duplicates = 0usize;
    for record in flattened {
        let key = record.identity_key();
        if !seen.insert(key.clone()) {
            duplicates += 1;
            continue;
        }
        let raw = record
            .date_time()
            .ok_or(AggregationError::MissingTimestamp { key: key.clone() })?;
        let timestamp = ReportTimestamp::from_str(raw)
            .map_err(|source| AggregationError::InvalidTimestamp { key, source })?;
        keyed.push((timestamp, record.clone()));
    }

    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    debug!(
        records = keyed.len(),
        duplicates, "merged documents"
    );
    Ok(Document::new(keyed.into_iter().map(|(_, r)| r).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;
    use pretty_assertions::assert_eq;

    fn record(label: &str, date_time: &str, node: &str, description: &str) -> Record {
        let mut record = Record::new();
        record.insert("LABEL", FieldValue::Text(label.into()));
        record.insert("Date/Time", FieldValue::Text(date_time.into()));
        record.insert("Node Id", FieldValue::Text(node.into()));
        record.insert("Description", FieldValue::Description(description.into()));
        record
    }

    fn labels(document: &Document) -> Vec<&str> {
        document
            .records()
            .iter()
            .filter_map(|r| r.text("LABEL"))
            .collect()
    }

    const T1: &str = "Mon Sep 27 08:12:45 GMT+02:00 2021";
    const T2: &str = "Fri Oct  1 14:01:15 GMT+02:00 2021";
    const T3: &str = "Wed Oct  6 13:27:04 GMT+02:00 2021";

    #[test]
    fn test_merge_sorts_chronologically() {
        let doc = Document::new(vec![
            record("C", T3, "n1", "third"),
            record("A", T1, "n1", "first"),
            record("B", T2, "n1", "second"),
        ]);
        let merged = merge(None, &[doc]).unwrap();
        assert_eq!(labels(&merged), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let doc = Document::new(vec![record("A", T1, "n1", "x"), record("B", T2, "n1", "y")]);
        let merged = merge(None, &[doc.clone(), doc.clone()]).unwrap();
        assert_eq!(merged.len(), 2);
        let again = merge(Some(&merged), &[merged.clone()]).unwrap();
        assert_eq!(again, merged);
    }

    #[test]
    fn test_merge_associative_for_dedup() {
        let a = Document::new(vec![record("A", T1, "n1", "a")]);
        let b = Document::new(vec![record("B", T2, "n1", "b")]);
        let c = Document::new(vec![record("C", T3, "n1", "c")]);

        let left = merge(Some(&merge(None, &[a.clone(), b.clone()]).unwrap()), &[c.clone()]).unwrap();
        let right = merge(Some(&merge(None, &[a]).unwrap()), &[b, c]).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_first_seen_wins_on_identical_identity() {
        // same identity 4-tuple, different incidental fields
        let mut first = record("A", T1, "n1", "same");
        first.insert("Sequence Number", FieldValue::Text("64".into()));
        let mut second = record("A", T1, "n1", "same");
        second.insert("Sequence Number", FieldValue::Text("99".into()));

        let merged = merge(
            None,
            &[Document::new(vec![first]), Document::new(vec![second])],
        )
        .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.records()[0].text("Sequence Number"), Some("64"));
    }

    #[test]
    fn test_base_records_take_precedence() {
        let base = Document::new(vec![record("A", T1, "n1", "base copy")]);
        let incoming = Document::new(vec![record("A", T1, "n1", "base copy")]);
        let merged = merge(Some(&base), &[incoming]).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_missing_date_time_fails_merge() {
        let mut no_time = Record::new();
        no_time.insert("LABEL", FieldValue::Text("A".into()));
        let doc = Document::new(vec![record("B", T1, "n1", "ok"), no_time]);
        let err = merge(None, &[doc]).unwrap_err();
        match err {
            AggregationError::MissingTimestamp { key } => {
                assert_eq!(key.label.as_deref(), Some("A"))
            }
            other => panic!("expected MissingTimestamp, got {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_date_time_fails_merge() {
        let doc = Document::new(vec![record("A", "yesterday at noon", "n1", "x")]);
        let err = merge(None, &[doc]).unwrap_err();
        assert!(matches!(err, AggregationError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_empty_merge_is_empty() {
        let merged = merge(None, &[]).unwrap();
        assert!(merged.is_empty());
    }
}

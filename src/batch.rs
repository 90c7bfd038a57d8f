//! Multi-source parsing.
//!
//! Parsing independent sources has no data dependency between them, so the
//! only real decision is what to do when one source fails. The original
//! converter hard-coded fail-fast; here the policy is the caller's:
//! [`ErrorPolicy::FailFast`] stops at the first bad source,
//! [`ErrorPolicy::CollectAll`] parses everything and reports every failure
//! together. Either way a failure names its source and keeps the inner
//! [`ParseError`] position.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Document;
use crate::parser::{ParseError, ReportParser};

/// What to do with the remaining sources after one fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the batch at the first failing source.
    #[default]
    FailFast,
    /// Parse every source, then report all failures at once.
    CollectAll,
}

/// One named raw-text source, typically a file's path and contents.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    #[error("{name}: {source}")]
    Source { name: String, source: ParseError },
    #[error("{} source(s) failed to parse: {}", .0.len(), format_failures(.0))]
    Multiple(Vec<(String, ParseError)>),
}

fn format_failures(failures: &[(String, ParseError)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{}: {}", name, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parses every source into a document, in input order.
#[tracing::instrument(level = "debug", skip_all, fields(sources = sources.len(), ?policy))]
pub fn parse_sources(sources: &[Source], policy: ErrorPolicy) -> Result<Vec<Document>, BatchError> {
    let parser = ReportParser::new();
    let mut documents = Vec::with_capacity(sources.len());
    let mut failures: Vec<(String, ParseError)> = Vec::new();

    for source in sources {
        match parser.parse(&source.text) {
            Ok(document) => {
                debug!(source = %source.name, records = document.len(), "parsed source");
                documents.push(document);
            }
            Err(err) => {
                warn!(source = %source.name, error = %err, "failed to parse source");
                match policy {
                    ErrorPolicy::FailFast => {
                        return Err(BatchError::Source {
                            name: source.name.clone(),
                            source: err,
                        })
                    }
                    ErrorPolicy::CollectAll => failures.push((source.name.clone(), err)),
                }
            }
        }
    }

    if failures.is_empty() {
        Ok(documents)
    } else {
        Err(BatchError::Multiple(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn good(name: &str) -> Source {
        Source::new(name, "LABEL: A\nDescription\nfine")
    }

    fn bad(name: &str) -> Source {
        Source::new(name, "this line has no colon at all!")
    }

    #[test]
    fn test_all_sources_parse() {
        let documents =
            parse_sources(&[good("a.raw"), good("b.raw")], ErrorPolicy::FailFast).unwrap();
        assert_eq!(documents.len(), 2);
    }

    #[test]
    fn test_fail_fast_stops_at_first_failure() {
        let err = parse_sources(
            &[good("a.raw"), bad("b.raw"), bad("c.raw")],
            ErrorPolicy::FailFast,
        )
        .unwrap_err();
        match err {
            BatchError::Source { name, .. } => assert_eq!(name, "b.raw"),
            other => panic!("expected Source, got {:?}", other),
        }
    }

    #[test]
    fn test_collect_all_reports_every_failure() {
        let err = parse_sources(
            &[bad("a.raw"), good("b.raw"), bad("c.raw")],
            ErrorPolicy::CollectAll,
        )
        .unwrap_err();
        match err {
            BatchError::Multiple(failures) => {
                let names: Vec<_> = failures.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["a.raw", "c.raw"]);
            }
            other => panic!("expected Multiple, got {:?}", other),
        }
    }

    #[test]
    fn test_error_policy_round_trips_through_serde() {
        let json = serde_json::to_string(&ErrorPolicy::CollectAll).unwrap();
        assert_eq!(json, "\"collect_all\"");
        let policy: ErrorPolicy = serde_json::from_str("\"fail_fast\"").unwrap();
        assert_eq!(policy, ErrorPolicy::FailFast);
    }
}

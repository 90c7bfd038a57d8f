use thiserror::Error;

use crate::aggregator::AggregationError;
use crate::batch::BatchError;
use crate::config::ConfigError;
use crate::parser::ParseError;
use crate::serializer::SerializerError;

/// Crate-level error, one variant per component plus the IO-class failures
/// that only the outer tool surfaces. Parse and aggregation failures are
/// kept distinct from IO: an unreadable file is not a malformed report.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Serializer error: {0}")]
    Serializer(#[from] SerializerError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

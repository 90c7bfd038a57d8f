//! JSON serialization of documents.
//!
//! The output format is a single object with one top-level array field,
//! `"Errpt Records"`; each element is a record object whose keys appear in
//! original field order, with string values, nested objects for
//! component-identity sub-blocks, and the `Description` string.
//!
//! The same format is read back so a previously written document can serve
//! as the base of a merge. Reading is strict: an envelope or record that
//! does not match the format is an error, never a best-effort document.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{Document, FieldValue, Record, DESCRIPTION_FIELD};

/// Name of the top-level array field.
pub const RECORDS_FIELD: &str = "Errpt Records";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializerError {
    #[error("document envelope is not an object with an \"Errpt Records\" array")]
    BadEnvelope,
    #[error("record {index} is not an object")]
    BadRecord { index: usize },
    #[error("record {index}, field {field:?}: unsupported value shape")]
    BadField { index: usize, field: String },
}

/// Document wrapper carrying the output envelope.
#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "Errpt Records")]
    records: &'a [Record],
}

/// Converts a document into the output-format JSON value.
pub fn to_value(document: &Document) -> Value {
    let records = document
        .records()
        .iter()
        .map(record_to_value)
        .collect::<Vec<_>>();
    let mut envelope = Map::with_capacity(1);
    envelope.insert(RECORDS_FIELD.to_string(), Value::Array(records));
    Value::Object(envelope)
}

fn record_to_value(record: &Record) -> Value {
    let mut fields = Map::new();
    for (name, value) in record.fields() {
        let entry = match value {
            FieldValue::Text(s) | FieldValue::Description(s) => Value::String(s.clone()),
            FieldValue::SubBlock(pairs) => Value::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        };
        fields.insert(name.to_string(), entry);
    }
    Value::Object(fields)
}

/// Renders a document as JSON text. `pretty` uses the 4-space indentation
/// the original report converter emitted.
pub fn to_json(document: &Document, pretty: bool) -> Result<String, serde_json::Error> {
    let envelope = Envelope {
        records: document.records(),
    };
    if pretty {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        envelope.serialize(&mut ser)?;
        // serde_json writes valid UTF-8
        Ok(String::from_utf8(out).expect("serializer produced invalid UTF-8"))
    } else {
        serde_json::to_string(&envelope)
    }
}

/// Reads a document back from its output-format JSON value.
pub fn from_value(value: &Value) -> Result<Document, SerializerError> {
    let records = value
        .as_object()
        .and_then(|envelope| envelope.get(RECORDS_FIELD))
        .and_then(Value::as_array)
        .ok_or(SerializerError::BadEnvelope)?;

    let mut out = Vec::with_capacity(records.len());
    for (index, entry) in records.iter().enumerate() {
        let fields = entry
            .as_object()
            .ok_or(SerializerError::BadRecord { index })?;
        out.push(record_from_fields(index, fields)?);
    }
    Ok(Document::new(out))
}

fn record_from_fields(index: usize, fields: &Map<String, Value>) -> Result<Record, SerializerError> {
    let mut record = Record::new();
    for (name, value) in fields {
        let field = match value {
            Value::String(s) if name == DESCRIPTION_FIELD => FieldValue::Description(s.clone()),
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Object(pairs) => {
                let mut sub_block = Vec::with_capacity(pairs.len());
                for (key, entry) in pairs {
                    let text = entry.as_str().ok_or_else(|| SerializerError::BadField {
                        index,
                        field: name.clone(),
                    })?;
                    sub_block.push((key.clone(), text.to_string()));
                }
                FieldValue::SubBlock(sub_block)
            }
            _ => {
                return Err(SerializerError::BadField {
                    index,
                    field: name.clone(),
                })
            }
        };
        record.insert(name.clone(), field);
    }
    Ok(record)
}

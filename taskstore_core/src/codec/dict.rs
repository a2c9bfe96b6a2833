use serde_json::Value as JsonValue;

use super::Codec;
use crate::types::value::{Datum, Document, document_from_json, document_to_json};

/// Serializes a document to JSON text. Naive instants are made aware first so
/// the stored text never depends on the reader's offset.
pub(super) fn encode(codec: &Codec, doc: &Document) -> Result<String, String> {
    let aware = attach_offsets(codec, doc)?;
    let json = document_to_json(&aware)?;
    serde_json::to_string(&json).map_err(|e| format!("Failed to serialize dict as JSON: {e}"))
}

pub(super) fn decode(codec: &Codec, text: &str) -> Result<Document, String> {
    let json: JsonValue =
        serde_json::from_str(text).map_err(|e| format!("Malformed dict JSON: {e}"))?;
    let obj = json
        .as_object()
        .ok_or_else(|| format!("Expected JSON object but got '{json}'"))?;
    attach_offsets(codec, &document_from_json(obj))
}

fn attach_offsets(codec: &Codec, doc: &Document) -> Result<Document, String> {
    doc.iter()
        .map(|(k, v)| Ok((k.clone(), attach_datum(codec, v)?)))
        .collect()
}

fn attach_datum(codec: &Codec, datum: &Datum) -> Result<Datum, String> {
    Ok(match datum {
        Datum::LocalTimestamp(ts) => Datum::Timestamp(codec.ensure_timezone(ts)?),
        Datum::List(items) => Datum::List(
            items
                .iter()
                .map(|d| attach_datum(codec, d))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Datum::Map(inner) => Datum::Map(attach_offsets(codec, inner)?),
        other => other.clone(),
    })
}

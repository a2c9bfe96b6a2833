//! Column codecs for task records.
//!
//! A `Codec` is built once per store and handed to every component that
//! converts between in-memory values and SQLite column values. It carries the
//! default offset used to make naive instants timezone-aware.

mod buffers;
mod dict;
mod timestamp;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, Utc};
use rusqlite::types::{Value as SqlValue, ValueRef};

use crate::error::{Result, StoreError};
use crate::types::field::{Field, FieldKind};
use crate::types::value::{Document, Value};

pub use buffers::{decode_buffers, encode_buffers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    offset: FixedOffset,
}

impl Codec {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Codec whose default offset is the host's current local offset.
    pub fn local() -> Self {
        Self::new(Local::now().offset().fix())
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Declared SQLite column type for a field kind. The schema manager
    /// compares these strings verbatim against `PRAGMA table_info`.
    pub fn declared_type(kind: FieldKind) -> &'static str {
        match kind {
            FieldKind::Text => "text",
            FieldKind::Dict => "dict text",
            FieldKind::Buffers => "bufs blob",
            FieldKind::Timestamp => "timestamp",
        }
    }

    /// Attaches the default offset to a naive instant.
    pub fn ensure_timezone(
        &self,
        ts: &NaiveDateTime,
    ) -> std::result::Result<DateTime<FixedOffset>, String> {
        ts.and_local_timezone(self.offset)
            .single()
            .ok_or_else(|| format!("Timestamp '{ts}' is out of range for offset {}", self.offset))
    }

    /// Encodes a column value, rejecting values of the wrong kind.
    pub fn encode(&self, field: Field, value: &Value) -> Result<SqlValue> {
        let kind = field.kind();
        if let Some(actual) = value.kind() {
            if actual != kind {
                return Err(StoreError::validation(format!(
                    "Field '{}' expects {} but got {}",
                    field,
                    kind.label(),
                    actual.label()
                )));
            }
        }
        let encoded = match value {
            Value::Null => SqlValue::Null,
            Value::Text(s) => SqlValue::Text(s.clone()),
            Value::Dict(doc) => SqlValue::Text(
                self.encode_dict(doc)
                    .map_err(|e| StoreError::codec(field.name(), e))?,
            ),
            Value::Buffers(bufs) => match encode_buffers(bufs) {
                Some(blob) => SqlValue::Blob(blob),
                None => SqlValue::Null,
            },
            Value::Timestamp(ts) => SqlValue::Text(timestamp::encode(ts)),
            Value::LocalTimestamp(ts) => {
                let aware = self
                    .ensure_timezone(ts)
                    .map_err(|e| StoreError::codec(field.name(), e))?;
                SqlValue::Text(timestamp::encode(&aware))
            }
        };
        Ok(encoded)
    }

    /// Decodes a column value. Buffer columns never decode to null.
    pub fn decode(&self, field: Field, raw: ValueRef<'_>) -> Result<Value> {
        let err = |message: String| StoreError::codec(field.name(), message);
        match field.kind() {
            FieldKind::Buffers => {
                let blob = match raw {
                    ValueRef::Null => None,
                    ValueRef::Blob(b) => Some(b),
                    other => {
                        return Err(err(format!("Expected blob but got {:?}", other.data_type())));
                    }
                };
                decode_buffers(blob).map(Value::Buffers).map_err(err)
            }
            _ if matches!(raw, ValueRef::Null) => Ok(Value::Null),
            FieldKind::Text => match raw {
                ValueRef::Text(t) => Ok(Value::Text(utf8(t).map_err(err)?)),
                ValueRef::Integer(n) => Ok(Value::Text(n.to_string())),
                ValueRef::Real(n) => Ok(Value::Text(n.to_string())),
                other => Err(err(format!("Expected text but got {:?}", other.data_type()))),
            },
            FieldKind::Dict => {
                let text = match raw {
                    ValueRef::Text(t) | ValueRef::Blob(t) => utf8(t).map_err(err)?,
                    other => {
                        return Err(err(format!(
                            "Expected JSON text but got {:?}",
                            other.data_type()
                        )));
                    }
                };
                self.decode_dict(&text).map(Value::Dict).map_err(err)
            }
            FieldKind::Timestamp => match raw {
                ValueRef::Text(t) => {
                    let text = utf8(t).map_err(err)?;
                    timestamp::decode(self, &text).map(Value::Timestamp).map_err(err)
                }
                other => Err(err(format!(
                    "Expected ISO-8601 text but got {:?}",
                    other.data_type()
                ))),
            },
        }
    }

    pub fn encode_dict(&self, doc: &Document) -> std::result::Result<String, String> {
        dict::encode(self, doc)
    }

    pub fn decode_dict(&self, text: &str) -> std::result::Result<Document, String> {
        dict::decode(self, text)
    }

    /// Renders an instant the way timestamp columns store it.
    pub fn encode_timestamp(&self, value: &Value) -> std::result::Result<String, String> {
        match value {
            Value::Timestamp(ts) => Ok(timestamp::encode(ts)),
            Value::LocalTimestamp(ts) => Ok(timestamp::encode(&self.ensure_timezone(ts)?)),
            other => Err(format!("Expected timestamp but got {other:?}")),
        }
    }

    pub fn decode_timestamp(
        &self,
        text: &str,
    ) -> std::result::Result<DateTime<FixedOffset>, String> {
        timestamp::decode(self, text)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::local()
    }
}

fn utf8(bytes: &[u8]) -> std::result::Result<String, String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| format!("Invalid UTF-8 in stored value: {e}"))
}

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as JsonValue};

use crate::types::field::FieldKind;

/// A structured-dict payload. Keys are kept sorted so two documents with the
/// same content compare and serialize identically.
pub type Document = BTreeMap<String, Datum>;

/// One node inside a structured dict: JSON plus instants.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    /// Instant without an offset; the codec attaches its default offset.
    LocalTimestamp(NaiveDateTime),
    List(Vec<Datum>),
    Map(Document),
}

/// Value of one task-record column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Dict(Document),
    Buffers(Vec<Vec<u8>>),
    Timestamp(DateTime<FixedOffset>),
    LocalTimestamp(NaiveDateTime),
}

impl Value {
    /// Kind carried by this value; `None` for null, which fits every column.
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Value::Null => None,
            Value::Text(_) => Some(FieldKind::Text),
            Value::Dict(_) => Some(FieldKind::Dict),
            Value::Buffers(_) => Some(FieldKind::Buffers),
            Value::Timestamp(_) | Value::LocalTimestamp(_) => Some(FieldKind::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Dict(doc)
    }
}

impl From<Vec<Vec<u8>>> for Value {
    fn from(bufs: Vec<Vec<u8>>) -> Self {
        Value::Buffers(bufs)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts.fixed_offset())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::LocalTimestamp(ts)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Text(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::Text(s)
    }
}

impl From<i64> for Datum {
    fn from(n: i64) -> Self {
        Datum::Int(n)
    }
}

impl From<f64> for Datum {
    fn from(n: f64) -> Self {
        Datum::Float(n)
    }
}

impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Datum::Bool(b)
    }
}

impl From<DateTime<FixedOffset>> for Datum {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        Datum::Timestamp(ts)
    }
}

impl From<NaiveDateTime> for Datum {
    fn from(ts: NaiveDateTime) -> Self {
        Datum::LocalTimestamp(ts)
    }
}

impl From<Document> for Datum {
    fn from(doc: Document) -> Self {
        Datum::Map(doc)
    }
}

impl Datum {
    /// Converts JSON into a datum, turning ISO-8601 date-time strings into
    /// instants along the way.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Datum::Null,
            JsonValue::Bool(b) => Datum::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Datum::Int(i),
                None => Datum::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => match parse_datetime(s) {
                Some(Value::Timestamp(ts)) => Datum::Timestamp(ts),
                Some(Value::LocalTimestamp(ts)) => Datum::LocalTimestamp(ts),
                _ => Datum::Text(s.clone()),
            },
            JsonValue::Array(items) => Datum::List(items.iter().map(Datum::from_json).collect()),
            JsonValue::Object(obj) => Datum::Map(document_from_json(obj)),
        }
    }

    /// Renders the datum as JSON. Instants become ISO-8601 strings.
    pub fn to_json(&self) -> Result<JsonValue, String> {
        Ok(match self {
            Datum::Null => JsonValue::Null,
            Datum::Bool(b) => JsonValue::Bool(*b),
            Datum::Int(n) => JsonValue::Number(Number::from(*n)),
            Datum::Float(n) => Number::from_f64(*n)
                .map(JsonValue::Number)
                .ok_or_else(|| format!("Cannot encode non-finite float {n}"))?,
            Datum::Text(s) => JsonValue::String(s.clone()),
            Datum::Timestamp(ts) => JsonValue::String(format_timestamp(ts)),
            Datum::LocalTimestamp(ts) => JsonValue::String(format_local_timestamp(ts)),
            Datum::List(items) => JsonValue::Array(
                items
                    .iter()
                    .map(Datum::to_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Datum::Map(doc) => JsonValue::Object(document_to_json(doc)?),
        })
    }
}

pub fn document_from_json(obj: &Map<String, JsonValue>) -> Document {
    obj.iter()
        .map(|(k, v)| (k.clone(), Datum::from_json(v)))
        .collect()
}

pub fn document_to_json(doc: &Document) -> Result<Map<String, JsonValue>, String> {
    let mut out = Map::new();
    for (k, v) in doc {
        out.insert(k.clone(), v.to_json()?);
    }
    Ok(out)
}

/// Parses a JSON value supplied for a column of the given kind.
pub fn parse_value(kind: FieldKind, json: &JsonValue) -> Result<Value, String> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    match kind {
        FieldKind::Text => match json {
            JsonValue::String(s) => Ok(Value::Text(s.clone())),
            other => Err(format!("Expected text but got '{other}'")),
        },
        FieldKind::Dict => match json {
            JsonValue::Object(obj) => Ok(Value::Dict(document_from_json(obj))),
            other => Err(format!("Expected JSON object but got '{other}'")),
        },
        FieldKind::Buffers => {
            let items = json
                .as_array()
                .ok_or_else(|| format!("Expected array of hex buffers but got '{json}'"))?;
            let mut bufs = Vec::with_capacity(items.len());
            for item in items {
                let token = item
                    .as_str()
                    .ok_or_else(|| format!("Expected hex buffer but got '{item}'"))?;
                let raw = token.strip_prefix("0x").unwrap_or(token);
                let bytes = hex::decode(raw).map_err(|_| {
                    format!("Expected hex buffer (e.g. 0xDEADBEEF) but got '{token}'")
                })?;
                bufs.push(bytes);
            }
            Ok(Value::Buffers(bufs))
        }
        FieldKind::Timestamp => {
            let token = json
                .as_str()
                .ok_or_else(|| format!("Expected timestamp string but got '{json}'"))?;
            parse_timestamp(token)
        }
    }
}

pub fn value_to_json(v: &Value) -> Result<JsonValue, String> {
    Ok(match v {
        Value::Null => JsonValue::Null,
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::Dict(doc) => JsonValue::Object(document_to_json(doc)?),
        Value::Buffers(bufs) => JsonValue::Array(
            bufs.iter()
                .map(|b| JsonValue::String(format!("0x{}", hex::encode_upper(b))))
                .collect(),
        ),
        Value::Timestamp(ts) => JsonValue::String(format_timestamp(ts)),
        Value::LocalTimestamp(ts) => JsonValue::String(format_local_timestamp(ts)),
    })
}

/// Parses an ISO-8601 timestamp. Offset-bearing input yields
/// `Value::Timestamp`; naive input (or a bare date) yields
/// `Value::LocalTimestamp`.
pub fn parse_timestamp(token: &str) -> Result<Value, String> {
    if let Some(ts) = parse_datetime(token) {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(token, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Value::LocalTimestamp)
        .ok_or_else(|| format!("Expected ISO-8601 timestamp but got '{token}'"))
}

pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

pub fn format_local_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

const AWARE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Recognizes full date-time strings (date, time with seconds, optional
/// fraction, optional offset). Anything else is left to the caller.
fn parse_datetime(s: &str) -> Option<Value> {
    let bytes = s.as_bytes();
    if bytes.len() < 19
        || bytes[4] != b'-'
        || bytes[7] != b'-'
        || !matches!(bytes[10], b'T' | b' ')
    {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(Value::Timestamp(ts));
    }
    for fmt in AWARE_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, fmt) {
            return Some(Value::Timestamp(ts));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Value::LocalTimestamp(ts));
        }
    }
    None
}

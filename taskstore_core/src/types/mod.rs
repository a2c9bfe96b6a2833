pub mod field;
pub mod value;

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};

use field::{Field, parse_field};
use value::{Value, parse_value, value_to_json};

/// A task record, or a subset of one. Iteration follows column order.
pub type Record = BTreeMap<Field, Value>;

/// A record with every one of the 22 fields present and null.
pub fn empty_record() -> Record {
    Field::ALL.iter().map(|f| (*f, Value::Null)).collect()
}

/// Parses a JSON object into a (partial) record, validating field names and
/// value kinds.
pub fn parse_record(json: &JsonValue) -> Result<Record, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| format!("Expected a JSON object of fields but got '{json}'"))?;
    let mut rec = Record::new();
    for (name, raw) in obj {
        let field = parse_field(name)?;
        let value = parse_value(field.kind(), raw).map_err(|e| format!("Field '{name}': {e}"))?;
        rec.insert(field, value);
    }
    Ok(rec)
}

pub fn record_to_json(rec: &Record) -> Result<JsonValue, String> {
    let mut out = Map::new();
    for (field, value) in rec {
        out.insert(field.name().to_string(), value_to_json(value)?);
    }
    Ok(JsonValue::Object(out))
}

use serde_json::Value as JsonValue;

use super::{Condition, Filter, Operand, Test};
use crate::error::{Result, StoreError};
use crate::types::field::{Field, FieldKind, parse_field};
use crate::types::value::{Value, document_from_json, parse_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TestOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    Lte,
    Gte,
    In,
    NotIn,
}

/// Accepts the Mongo spelling (`$lt`) and the bare one (`lt`).
fn parse_op(raw: &str) -> Result<TestOp> {
    match raw.strip_prefix('$').unwrap_or(raw) {
        "eq" => Ok(TestOp::Eq),
        "ne" => Ok(TestOp::NotEq),
        "lt" => Ok(TestOp::Lt),
        "gt" => Ok(TestOp::Gt),
        "lte" => Ok(TestOp::Lte),
        "gte" => Ok(TestOp::Gte),
        "in" => Ok(TestOp::In),
        "nin" => Ok(TestOp::NotIn),
        _ => Err(StoreError::validation(format!(
            "Unsupported operator '{raw}'. Use $eq|$ne|$lt|$gt|$lte|$gte|$in|$nin"
        ))),
    }
}

/// Parses an external filter expression. Field names, operators and operand
/// shapes are validated here; per-field rules the typed API can also violate
/// are checked again when compiling.
pub fn parse_filter(json: &JsonValue) -> Result<Filter> {
    let obj = json.as_object().ok_or_else(|| {
        StoreError::validation(format!("Filter must be a JSON object but got '{json}'"))
    })?;

    let mut conditions: Vec<Condition> = Vec::new();
    for (name, clause) in obj {
        let field = parse_field(name).map_err(StoreError::Validation)?;
        if !field.kind().is_filterable() {
            return Err(StoreError::validation(format!(
                "Field '{field}' holds opaque buffers and cannot be filtered"
            )));
        }
        match clause {
            JsonValue::Object(tests) => {
                for (raw_op, arg) in tests {
                    let test = parse_test(field, parse_op(raw_op)?, arg)?;
                    conditions.push(Condition { field, test });
                }
            }
            literal => {
                let operand = parse_operand(field, literal)?;
                conditions.push(Condition {
                    field,
                    test: Test::Eq(operand),
                });
            }
        }
    }
    Ok(Filter { conditions })
}

fn parse_test(field: Field, op: TestOp, arg: &JsonValue) -> Result<Test> {
    let scalar = |wrap: fn(Operand) -> Test| -> Result<Test> {
        Ok(wrap(parse_operand(field, arg)?))
    };
    let set = |wrap: fn(Vec<Operand>) -> Test| -> Result<Test> {
        let items = arg.as_array().ok_or_else(|| {
            StoreError::validation(format!(
                "Operator on field '{field}' needs an array of values but got '{arg}'"
            ))
        })?;
        let operands = items
            .iter()
            .map(|item| parse_operand(field, item))
            .collect::<Result<Vec<_>>>()?;
        Ok(wrap(operands))
    };
    match op {
        TestOp::Eq => scalar(Test::Eq),
        TestOp::NotEq => scalar(Test::NotEq),
        TestOp::Lt => scalar(Test::Lt),
        TestOp::Gt => scalar(Test::Gt),
        TestOp::Lte => scalar(Test::Lte),
        TestOp::Gte => scalar(Test::Gte),
        TestOp::In => set(Test::In),
        TestOp::NotIn => set(Test::NotIn),
    }
}

fn parse_operand(field: Field, json: &JsonValue) -> Result<Operand> {
    match json {
        JsonValue::Null => Ok(Operand::Null),
        JsonValue::Bool(b) => Ok(Operand::Integer(i64::from(*b))),
        JsonValue::Number(n) => Ok(match n.as_i64() {
            Some(i) => Operand::Integer(i),
            None => Operand::Real(n.as_f64().unwrap_or(f64::NAN)),
        }),
        JsonValue::String(s) if field.kind() == FieldKind::Timestamp => {
            match parse_timestamp(s).map_err(StoreError::Validation)? {
                Value::LocalTimestamp(ts) => Ok(Operand::LocalTimestamp(ts)),
                Value::Timestamp(ts) => Ok(Operand::Timestamp(ts)),
                _ => Err(StoreError::validation(format!(
                    "Field '{field}' needs a timestamp but got '{s}'"
                ))),
            }
        }
        JsonValue::String(s) => Ok(Operand::Text(s.clone())),
        JsonValue::Object(obj) if field.kind() == FieldKind::Dict => {
            Ok(Operand::Dict(document_from_json(obj)))
        }
        JsonValue::Object(_) => Err(StoreError::validation(format!(
            "Field '{field}' cannot be compared against an object"
        ))),
        JsonValue::Array(_) => Err(StoreError::validation(format!(
            "Arrays are only valid with $in/$nin (field '{field}')"
        ))),
    }
}

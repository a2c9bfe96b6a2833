use super::{Condition, Filter, Operand, Predicate, Test};
use crate::error::{Result, StoreError};
use crate::types::field::{Field, FieldKind};
use crate::types::value::{Value, parse_timestamp};

/// Compiles a filter into a parameterized predicate. Operands only ever
/// appear in `params`; the SQL text holds quoted catalog names, operators and
/// placeholders.
pub fn compile_filter(filter: &Filter) -> Result<Predicate> {
    let mut clauses: Vec<String> = Vec::with_capacity(filter.conditions.len());
    let mut params: Vec<Operand> = Vec::new();

    for cond in &filter.conditions {
        let cond = normalize_condition(cond)?;
        clauses.push(compile_condition(&cond, &mut params));
    }

    let sql = if clauses.is_empty() {
        "1".to_string()
    } else {
        clauses.join(" AND ")
    };
    Ok(Predicate { sql, params })
}

/// Checks a condition against its field and rewrites operands into the form
/// the column stores.
fn normalize_condition(cond: &Condition) -> Result<Condition> {
    let Condition { field, test } = cond;
    let field = *field;
    if !field.kind().is_filterable() {
        return Err(StoreError::validation(format!(
            "Field '{field}' holds opaque buffers and cannot be filtered"
        )));
    }
    let one = |v: &Operand| normalize_operand(field, test, v);
    let test = match test {
        Test::Eq(v) => Test::Eq(one(v)?),
        Test::NotEq(v) => Test::NotEq(one(v)?),
        Test::Lt(v) | Test::Gt(v) | Test::Lte(v) | Test::Gte(v) => {
            if v.is_null() {
                return Err(StoreError::validation(format!(
                    "Cannot use {} test with NULL on field '{field}'",
                    test.op_name()
                )));
            }
            if matches!(v, Operand::Dict(_)) {
                return Err(StoreError::validation(format!(
                    "Cannot order field '{field}' against a dict with {}",
                    test.op_name()
                )));
            }
            let v = one(v)?;
            match test {
                Test::Lt(_) => Test::Lt(v),
                Test::Gt(_) => Test::Gt(v),
                Test::Lte(_) => Test::Lte(v),
                _ => Test::Gte(v),
            }
        }
        Test::In(items) | Test::NotIn(items) => {
            // Equality tests don't match NULL, so a NULL member would be silently ignored.
            if items.iter().any(Operand::is_null) {
                return Err(StoreError::validation(format!(
                    "Cannot use {} test with NULL values on field '{field}'",
                    test.op_name()
                )));
            }
            let items = items.iter().map(one).collect::<Result<Vec<_>>>()?;
            match test {
                Test::In(_) => Test::In(items),
                _ => Test::NotIn(items),
            }
        }
    };
    Ok(Condition { field, test })
}

fn normalize_operand(field: Field, test: &Test, operand: &Operand) -> Result<Operand> {
    let kind = field.kind();
    match operand {
        Operand::Dict(_) if kind != FieldKind::Dict => Err(StoreError::validation(format!(
            "Field '{field}' cannot be compared against a dict with {}",
            test.op_name()
        ))),
        Operand::Null | Operand::Timestamp(_) | Operand::LocalTimestamp(_)
            if kind == FieldKind::Timestamp =>
        {
            Ok(operand.clone())
        }
        Operand::Text(s) if kind == FieldKind::Timestamp => match parse_timestamp(s) {
            Ok(Value::Timestamp(ts)) => Ok(Operand::Timestamp(ts)),
            Ok(Value::LocalTimestamp(ts)) => Ok(Operand::LocalTimestamp(ts)),
            _ => Err(StoreError::validation(format!(
                "Field '{field}' needs an ISO-8601 timestamp but got '{s}'"
            ))),
        },
        _ if kind == FieldKind::Timestamp => Err(StoreError::validation(format!(
            "Field '{field}' needs a timestamp with {} but got {operand:?}",
            test.op_name()
        ))),
        Operand::Timestamp(_) | Operand::LocalTimestamp(_) => Err(StoreError::validation(format!(
            "Field '{field}' is not a timestamp and cannot be compared against one"
        ))),
        _ => Ok(operand.clone()),
    }
}

fn compile_condition(cond: &Condition, params: &mut Vec<Operand>) -> String {
    let col = cond.field.quoted();
    match &cond.test {
        Test::Eq(Operand::Null) => format!("{col} IS NULL"),
        Test::NotEq(Operand::Null) => format!("{col} IS NOT NULL"),
        Test::Eq(v) => bind(&col, "=", v, params),
        Test::NotEq(v) => bind(&col, "!=", v, params),
        Test::Lt(v) => bind(&col, "<", v, params),
        Test::Gt(v) => bind(&col, ">", v, params),
        Test::Lte(v) => bind(&col, "<=", v, params),
        Test::Gte(v) => bind(&col, ">=", v, params),
        Test::In(items) => expand(&col, "=", " OR ", "0", items, params),
        Test::NotIn(items) => expand(&col, "!=", " AND ", "1", items, params),
    }
}

fn bind(col: &str, op: &str, operand: &Operand, params: &mut Vec<Operand>) -> String {
    params.push(operand.clone());
    format!("{col} {op} ?")
}

/// One sub-predicate per member, joined; an empty set yields `empty`.
fn expand(
    col: &str,
    op: &str,
    join: &str,
    empty: &str,
    items: &[Operand],
    params: &mut Vec<Operand>,
) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = items.iter().map(|v| bind(col, op, v, params)).collect();
    format!("( {} )", parts.join(join))
}

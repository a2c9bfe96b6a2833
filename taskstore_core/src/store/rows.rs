use rusqlite::Row;
use rusqlite::types::Value as SqlValue;

use crate::codec::Codec;
use crate::error::{Result, StoreError};
use crate::filter::Operand;
use crate::types::Record;
use crate::types::field::Field;
use crate::types::value::Value;

/// Decodes a result row whose columns are `fields`, in that order.
pub(super) fn decode_row(codec: &Codec, row: &Row<'_>, fields: &[Field]) -> Result<Record> {
    let mut rec = Record::new();
    for (idx, field) in fields.iter().enumerate() {
        let raw = row.get_ref(idx)?;
        rec.insert(*field, codec.decode(*field, raw)?);
    }
    Ok(rec)
}

/// Turns compiled filter operands into engine parameters, in order.
pub(super) fn bind_params(codec: &Codec, params: &[Operand]) -> Result<Vec<SqlValue>> {
    params.iter().map(|op| bind_operand(codec, op)).collect()
}

fn bind_operand(codec: &Codec, operand: &Operand) -> Result<SqlValue> {
    let err = |message: String| StoreError::codec("filter", message);
    Ok(match operand {
        Operand::Null => SqlValue::Null,
        Operand::Integer(n) => SqlValue::Integer(*n),
        Operand::Real(n) => SqlValue::Real(*n),
        Operand::Text(s) => SqlValue::Text(s.clone()),
        Operand::Timestamp(ts) => {
            SqlValue::Text(codec.encode_timestamp(&Value::Timestamp(*ts)).map_err(err)?)
        }
        Operand::LocalTimestamp(ts) => {
            SqlValue::Text(codec.encode_timestamp(&Value::LocalTimestamp(*ts)).map_err(err)?)
        }
        Operand::Dict(doc) => SqlValue::Text(codec.encode_dict(doc).map_err(err)?),
    })
}

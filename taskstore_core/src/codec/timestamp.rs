use chrono::{DateTime, FixedOffset, Utc};

use super::Codec;
use crate::types::value::{Value, format_timestamp, parse_timestamp};

/// Stored timestamps are always UTC, so their text order is chronological.
pub(super) fn encode(ts: &DateTime<FixedOffset>) -> String {
    format_timestamp(&ts.with_timezone(&Utc).fixed_offset())
}

/// Parses stored ISO-8601 text; naive text takes the codec's default offset.
pub(super) fn decode(codec: &Codec, text: &str) -> Result<DateTime<FixedOffset>, String> {
    match parse_timestamp(text)? {
        Value::Timestamp(ts) => Ok(ts),
        Value::LocalTimestamp(ts) => codec.ensure_timezone(&ts),
        other => Err(format!("Expected timestamp but got {other:?}")),
    }
}

use chrono::{FixedOffset, NaiveDate, TimeZone};
use rusqlite::types::{Value as SqlValue, ValueRef};
use taskstore_core::codec::{decode_buffers, encode_buffers};
use taskstore_core::{Codec, Datum, Document, Field, StoreError, Value};

use crate::common::ts;

fn offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap()
}

fn roundtrip(codec: &Codec, field: Field, value: &Value) -> Value {
    let encoded = codec.encode(field, value).unwrap();
    codec.decode(field, ValueRef::from(&encoded)).unwrap()
}

fn nested_doc() -> Document {
    let mut inner = Document::new();
    inner.insert("started".to_string(), Datum::Timestamp(ts(1_700_000_000)));
    inner.insert("ratio".to_string(), Datum::Float(0.25));
    inner.insert("whole_float".to_string(), Datum::Float(2.0));

    let mut doc = Document::new();
    doc.insert("msg_type".to_string(), Datum::from("execute_request"));
    doc.insert("seq".to_string(), Datum::Int(-42));
    doc.insert("ok".to_string(), Datum::Bool(true));
    doc.insert("none".to_string(), Datum::Null);
    doc.insert(
        "dates".to_string(),
        Datum::List(vec![
            Datum::Timestamp(offset(5).with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()),
            Datum::from("not a date"),
        ]),
    );
    doc.insert("inner".to_string(), Datum::Map(inner));
    doc
}

#[test]
fn dict_roundtrip_is_structural() {
    let codec = Codec::new(offset(2));
    let doc = nested_doc();
    let back = roundtrip(&codec, Field::Header, &Value::Dict(doc.clone()));
    assert_eq!(back, Value::Dict(doc));
}

#[test]
fn dict_naive_timestamps_come_back_aware() {
    let codec = Codec::new(offset(-7));
    let naive = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    let mut doc = Document::new();
    doc.insert("date".to_string(), Datum::LocalTimestamp(naive));

    let Value::Dict(back) = roundtrip(&codec, Field::Metadata, &Value::Dict(doc)) else {
        panic!("expected a dict");
    };
    let expected = offset(-7).from_local_datetime(&naive).unwrap();
    assert_eq!(back.get("date"), Some(&Datum::Timestamp(expected)));
}

#[test]
fn dict_date_strings_are_reconstituted() {
    let codec = Codec::utc();
    let doc = codec
        .decode_dict(r#"{"date": "2024-05-06T07:08:09.123456+00:00", "name": "x"}"#)
        .unwrap();
    match doc.get("date") {
        Some(Datum::Timestamp(t)) => assert_eq!(t.timestamp_subsec_micros(), 123_456),
        other => panic!("expected timestamp, got {other:?}"),
    }
    assert_eq!(doc.get("name"), Some(&Datum::from("x")));
}

#[test]
fn dict_rejects_non_object_and_non_finite() {
    let codec = Codec::utc();
    assert!(codec.decode_dict("[1, 2]").is_err());
    assert!(codec.decode_dict("{not json").is_err());

    let mut doc = Document::new();
    doc.insert("bad".to_string(), Datum::Float(f64::NAN));
    let err = codec.encode(Field::Content, &Value::Dict(doc)).unwrap_err();
    assert!(matches!(err, StoreError::Codec { .. }));
}

#[test]
fn buffers_roundtrip_exact_bytes_and_order() {
    let codec = Codec::utc();
    let bufs = vec![
        b"first".to_vec(),
        Vec::new(),
        (0u8..=255).collect::<Vec<_>>(),
        vec![0, 0, 0, 0],
    ];
    let back = roundtrip(&codec, Field::Buffers, &Value::Buffers(bufs.clone()));
    assert_eq!(back, Value::Buffers(bufs));
}

#[test]
fn buffers_null_and_empty_are_equivalent() {
    let codec = Codec::utc();
    assert_eq!(encode_buffers(&[]), None);
    assert_eq!(
        codec.encode(Field::ResultBuffers, &Value::Buffers(vec![])).unwrap(),
        SqlValue::Null
    );
    assert_eq!(
        codec.encode(Field::ResultBuffers, &Value::Null).unwrap(),
        SqlValue::Null
    );
    assert_eq!(
        codec.decode(Field::ResultBuffers, ValueRef::Null).unwrap(),
        Value::Buffers(vec![])
    );
}

#[test]
fn buffers_malformed_envelopes_error() {
    let good = encode_buffers(&[b"abc".to_vec()]).unwrap();
    assert!(decode_buffers(Some(&good[..good.len() - 1])).is_err());

    let mut trailing = good.clone();
    trailing.push(9);
    assert!(decode_buffers(Some(trailing.as_slice())).is_err());

    assert!(decode_buffers(Some(&[1u8, 0][..])).is_err());
    assert_eq!(decode_buffers(Some(good.as_slice())).unwrap(), vec![b"abc".to_vec()]);
}

#[test]
fn timestamp_roundtrip_preserves_instant() {
    let codec = Codec::new(offset(3));
    let aware = offset(-4).with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
    assert_eq!(
        roundtrip(&codec, Field::Submitted, &Value::Timestamp(aware)),
        Value::Timestamp(aware)
    );

    let naive = NaiveDate::from_ymd_opt(2023, 6, 1)
        .unwrap()
        .and_hms_micro_opt(8, 0, 0, 500)
        .unwrap();
    let back = roundtrip(&codec, Field::Completed, &Value::LocalTimestamp(naive));
    let expected = offset(3).from_local_datetime(&naive).unwrap();
    assert_eq!(back, Value::Timestamp(expected));
}

#[test]
fn timestamps_are_stored_as_utc_text() {
    let codec = Codec::utc();
    let aware = offset(5).with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap();
    assert_eq!(
        codec.encode(Field::Started, &Value::Timestamp(aware)).unwrap(),
        SqlValue::Text("2024-01-01T00:00:00+00:00".to_string())
    );
}

#[test]
fn timestamp_decode_accepts_naive_and_space_separated_text() {
    let codec = Codec::new(offset(1));
    let spaced = codec.decode_timestamp("2024-02-03 04:05:06").unwrap();
    assert_eq!(spaced, offset(1).with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap());
    let zulu = codec.decode_timestamp("2024-02-03T04:05:06Z").unwrap();
    assert_eq!(zulu, ts(1_706_933_106));
    assert!(codec.decode_timestamp("yesterday").is_err());
}

#[test]
fn encode_rejects_wrong_kind() {
    let codec = Codec::utc();
    let err = codec
        .encode(Field::Stdout, &Value::Dict(Document::new()))
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    let err = codec.encode(Field::Submitted, &Value::from("now")).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[test]
fn declared_types_follow_kinds() {
    assert_eq!(Codec::declared_type(Field::MsgId.kind()), "text");
    assert_eq!(Codec::declared_type(Field::Header.kind()), "dict text");
    assert_eq!(Codec::declared_type(Field::Buffers.kind()), "bufs blob");
    assert_eq!(Codec::declared_type(Field::Received.kind()), "timestamp");
}

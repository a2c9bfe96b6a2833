use serde_json::json;
use taskstore_core::{Datum, Document, Field, Filter, Operand, StoreError, Test};

use crate::common::ts;

fn compile(json: serde_json::Value) -> Result<(String, Vec<Operand>), StoreError> {
    let predicate = Filter::from_json(&json)?.compile()?;
    Ok((predicate.sql, predicate.params))
}

fn is_validation(result: Result<(String, Vec<Operand>), StoreError>) -> bool {
    matches!(result, Err(StoreError::Validation(_)))
}

#[test]
fn literal_compiles_to_single_bound_equality() {
    let (sql, params) = compile(json!({"queue": 5})).unwrap();
    assert_eq!(sql, "\"queue\" = ?");
    assert_eq!(params, vec![Operand::Integer(5)]);
}

#[test]
fn null_literal_compiles_to_is_null_without_params() {
    let (sql, params) = compile(json!({"engine_uuid": null})).unwrap();
    assert_eq!(sql, "\"engine_uuid\" IS NULL");
    assert!(params.is_empty());

    let (sql, params) = compile(json!({"completed": {"$ne": null}})).unwrap();
    assert_eq!(sql, "\"completed\" IS NOT NULL");
    assert!(params.is_empty());

    let (sql, _) = compile(json!({"stdout": {"$eq": null}})).unwrap();
    assert_eq!(sql, "\"stdout\" IS NULL");
}

#[test]
fn in_expands_to_ored_equalities_in_order() {
    let (sql, params) = compile(json!({"client_uuid": {"$in": [1, 2, 3]}})).unwrap();
    assert_eq!(sql, "( \"client_uuid\" = ? OR \"client_uuid\" = ? OR \"client_uuid\" = ? )");
    assert_eq!(
        params,
        vec![Operand::Integer(1), Operand::Integer(2), Operand::Integer(3)]
    );
}

#[test]
fn nin_expands_to_anded_inequalities() {
    let (sql, params) = compile(json!({"queue": {"nin": ["a", "b"]}})).unwrap();
    assert_eq!(sql, "( \"queue\" != ? AND \"queue\" != ? )");
    assert_eq!(params, vec![Operand::from("a"), Operand::from("b")]);
}

#[test]
fn null_inside_set_membership_is_rejected() {
    assert!(is_validation(compile(json!({"queue": {"$in": [1, null]}}))));
    assert!(is_validation(compile(json!({"queue": {"$nin": [null]}}))));

    let typed = Filter::all().and(Field::Queue, Test::In(vec![Operand::Null]));
    assert!(matches!(typed.compile(), Err(StoreError::Validation(_))));
}

#[test]
fn unknown_field_and_operator_are_rejected() {
    assert!(is_validation(compile(json!({"unknown_field": 1}))));
    assert!(is_validation(compile(json!({"queue": {"$regex": "a.*"}}))));
    assert!(is_validation(compile(json!({"queue": {"$all": ["a"]}}))));
}

#[test]
fn buffer_fields_are_not_filterable() {
    assert!(is_validation(compile(json!({"buffers": null}))));
    assert!(is_validation(compile(json!({"result_buffers": {"$ne": null}}))));

    let typed = Filter::eq(Field::ResultBuffers, Operand::Null);
    assert!(matches!(typed.compile(), Err(StoreError::Validation(_))));
}

#[test]
fn ordering_against_null_is_rejected() {
    assert!(is_validation(compile(json!({"submitted": {"$lt": null}}))));
    assert!(is_validation(compile(json!({"queue": {"gte": null}}))));
}

#[test]
fn arrays_need_set_operators_and_sets_need_arrays() {
    assert!(is_validation(compile(json!({"queue": ["a", "b"]}))));
    assert!(is_validation(compile(json!({"queue": {"$eq": ["a"]}}))));
    assert!(is_validation(compile(json!({"queue": {"$in": "a"}}))));
}

#[test]
fn fields_and_operators_are_anded_with_params_in_order() {
    let (sql, params) = compile(json!({
        "queue": "default",
        "submitted": {"$gte": "2024-01-01T00:00:00+00:00", "$lt": "2024-01-02T00:00:00Z"}
    }))
    .unwrap();
    assert_eq!(sql, "\"queue\" = ? AND \"submitted\" >= ? AND \"submitted\" < ?");
    assert_eq!(
        params,
        vec![
            Operand::from("default"),
            Operand::Timestamp(ts(1_704_067_200)),
            Operand::Timestamp(ts(1_704_153_600)),
        ]
    );
}

#[test]
fn values_never_reach_the_sql_text() {
    let (sql, params) = compile(json!({"stdout": "'; DROP TABLE tasks; --"})).unwrap();
    assert_eq!(sql, "\"stdout\" = ?");
    assert_eq!(params, vec![Operand::from("'; DROP TABLE tasks; --")]);
}

#[test]
fn timestamp_operands_must_parse() {
    assert!(is_validation(compile(json!({"started": "last tuesday"}))));
}

#[test]
fn dict_operands_only_for_dict_fields() {
    let (sql, params) = compile(json!({"header": {"$eq": {"msg_type": "ping"}}})).unwrap();
    assert_eq!(sql, "\"header\" = ?");
    let mut doc = Document::new();
    doc.insert("msg_type".to_string(), Datum::from("ping"));
    assert_eq!(params, vec![Operand::Dict(doc.clone())]);

    assert!(is_validation(compile(json!({"queue": {"$eq": {"a": 1}}}))));
    let typed = Filter::all().and(Field::Header, Test::Gt(Operand::Dict(doc)));
    assert!(matches!(typed.compile(), Err(StoreError::Validation(_))));
}

#[test]
fn empty_filters_and_sets_compile_to_constants() {
    let (sql, params) = compile(json!({})).unwrap();
    assert_eq!(sql, "1");
    assert!(params.is_empty());

    let (sql, _) = compile(json!({"queue": {"$in": []}})).unwrap();
    assert_eq!(sql, "0");
    let (sql, _) = compile(json!({"queue": {"$nin": []}})).unwrap();
    assert_eq!(sql, "1");
}

#[test]
fn non_object_filter_is_rejected() {
    assert!(matches!(
        Filter::from_json(&json!(["queue"])),
        Err(StoreError::Validation(_))
    ));
}

#[test]
fn typed_text_operands_on_timestamp_fields_are_parsed() {
    let predicate = Filter::eq(Field::Submitted, "2024-01-01T00:00:00Z").compile().unwrap();
    assert_eq!(predicate.sql, "\"submitted\" = ?");
    assert_eq!(predicate.params, vec![Operand::Timestamp(ts(1_704_067_200))]);

    let bad = Filter::eq(Field::Started, "soon");
    assert!(matches!(bad.compile(), Err(StoreError::Validation(_))));
    let number = Filter::all().and(Field::Completed, Test::Gt(Operand::Integer(5)));
    assert!(matches!(number.compile(), Err(StoreError::Validation(_))));
}

#[test]
fn timestamp_operands_on_other_fields_are_rejected() {
    let on_text = Filter::eq(Field::Queue, ts(0));
    assert!(matches!(on_text.compile(), Err(StoreError::Validation(_))));

    let on_dict = Filter::all().and(Field::Header, Test::In(vec![Operand::Timestamp(ts(0))]));
    assert!(matches!(on_dict.compile(), Err(StoreError::Validation(_))));
}

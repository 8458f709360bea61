//! Tests for gathering values by path and folding them through a schema.

use schemata::{JsonPath, Schema, SourcePath};
use serde_json::json;

/// Helper to extract the success value from a Validation
fn unwrap_success<T, E: std::fmt::Debug>(v: stillwater::Validation<T, E>) -> T {
    v.into_result().unwrap()
}

#[test]
fn test_path_fan_out_preserves_array_order() {
    let root = json!({"a": [{"b": 1}, {"b": 2}, {"b": 3}]});
    assert_eq!(
        SourcePath::parse("a/b").resolve(&root),
        vec![json!(1), json!(2), json!(3)]
    );

    let schema = Schema::compile(&json!({".type": "array", ".list": "a/b"})).unwrap();
    assert_eq!(schema.accumulate(None, None, &root).unwrap(), Some(json!([1, 2, 3])));
}

#[test]
fn test_fan_out_through_nested_arrays() {
    let root = json!({
        "orders": [
            {"lines": [{"sku": "a"}, {"sku": "b"}]},
            {"lines": [{"sku": "c"}]},
            {"lines": []},
            {"note": "no lines"}
        ]
    });
    assert_eq!(
        SourcePath::parse("orders/lines/sku").resolve(&root),
        vec![json!("a"), json!("b"), json!("c")]
    );
}

#[test]
fn test_unresolvable_paths_contribute_nothing() {
    let root = json!({"a": 1, "b": {"c": "x"}});
    assert!(SourcePath::parse("a/b").resolve(&root).is_empty());
    assert!(SourcePath::parse("b/missing").resolve(&root).is_empty());
    assert!(SourcePath::parse("nowhere").resolve(&root).is_empty());
}

#[test]
fn test_mean_scenario() {
    let schema = Schema::compile(&json!({
        "dataPoints": {
            ".type": "array",
            ".all": {"x": {".type": "number"}, "y": {".type": "number"}}
        },
        "average": {
            "x": {".type": "number", ".list": "dataPoints/x", ".mean": true},
            "y": {".type": "number", ".list": "dataPoints/y", ".mean": true}
        }
    }))
    .unwrap();

    let doc = json!({"dataPoints": [{"x": 0, "y": 10}, {"x": 5, "y": 20}]});
    let out = schema.transform(None, &doc).unwrap();

    assert_eq!(out["average"], json!({"x": 2.5, "y": 15}));
    assert_eq!(out["dataPoints"], doc["dataPoints"]);
    unwrap_success(schema.validate(&out, &JsonPath::root()));
}

#[test]
fn test_total_over_list() {
    let schema = Schema::compile(&json!({
        "items": {".type": "array", ".all": {"qty": {".type": "integer"}}},
        "count": {".type": "integer", ".list": "items/qty", ".total": true}
    }))
    .unwrap();

    let out = schema
        .transform(None, &json!({"items": [{"qty": 2}, {"qty": 3}, {"qty": 4}]}))
        .unwrap();
    assert_eq!(out["count"], json!(9));
}

#[test]
fn test_fill_folds_into_target() {
    let schema = Schema::compile(&json!({".type": "number", ".add": true, ".fill": "scores/points"})).unwrap();
    let root = json!({"scores": [{"points": 1}, {"points": 2}, {"points": 3}]});
    assert_eq!(schema.accumulate(None, None, &root).unwrap(), Some(json!(6)));
    assert_eq!(schema.accumulate(Some(&json!(100)), None, &root).unwrap(), Some(json!(106)));
    assert_eq!(schema.accumulate(None, None, &json!({})).unwrap(), None);
}

#[test]
fn test_schema_source() {
    let schema = Schema::compile(&json!({
        ".type": "array",
        ".list": {".type": "array", ".list": "teams/members/name"},
        ".unique": true
    }))
    .unwrap();
    let root = json!({
        "teams": [
            {"members": [{"name": "ann"}, {"name": "bo"}]},
            {"members": [{"name": "bo"}, {"name": "cy"}]}
        ]
    });
    assert_eq!(
        schema.accumulate(None, None, &root).unwrap(),
        Some(json!(["ann", "bo", "cy"]))
    );
}

#[test]
fn test_group_with_transform() {
    let schema = Schema::compile(&json!({
        ".type": "array",
        ".list": "readings/value",
        ".group": {".modFilter": 3},
        ".groupTransform": {".type": "number", ".mean": true}
    }))
    .unwrap();
    let root = json!({"readings": [{"value": 1}, {"value": 2}, {"value": 3}, {"value": 4}, {"value": 5}, {"value": 6}]});
    assert_eq!(
        schema.accumulate(None, None, &root).unwrap(),
        Some(json!([2.5, 3.5, 4.5]))
    );
}

#[test]
fn test_group_by_date_field() {
    let schema = Schema::compile(&json!({
        ".type": "array",
        ".list": "sales/day",
        ".group": {".getMonthName": true}
    }))
    .unwrap();
    let root = json!({"sales": [{"day": "2023-01-01"}, {"day": "2024-05-05"}, {"day": "2023-01-09"}]});
    assert_eq!(
        schema.accumulate(None, None, &root).unwrap(),
        Some(json!([["2023-01-01", "2023-01-09"], ["2024-05-05"]]))
    );
}

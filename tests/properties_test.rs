//! Tests for properties every schema upholds.

use schemata::{JsonPath, Schema};
use serde_json::{json, Value};

fn schemas() -> Vec<Value> {
    vec![
        json!({
            "name": {".type": "string", ".case": "upper", ".max": 8},
            "visits": {".type": "integer", ".add": true, ".max": 100},
            "tags": {".type": "array", ".append": true, ".unique": true, ".clip": 3}
        }),
        json!({".type": "array", ".prepend": true, ".sort": true, ".min": 1}),
        json!({".type": "object", ".adHoc": true, ".clip": 2}),
        json!({".type": "string", ".append": true, ".clip": -5}),
        json!({".type": "number", ".average": 0.25, ".min": 0}),
    ]
}

fn cases() -> Vec<(Option<Value>, Value)> {
    vec![
        (None, json!({"name": "ada", "visits": 1, "tags": ["a"]})),
        (
            Some(json!({"name": "ADA", "visits": 99, "tags": ["a", "b"]})),
            json!({"name": "grace", "visits": 1, "tags": ["b", "c", "d"]}),
        ),
        (
            Some(json!({"name": "x", "visits": 100, "tags": []})),
            json!({"name": "y", "visits": 1, "tags": []}),
        ),
        (Some(json!([3, 1])), json!([2, 5])),
        (Some(json!({"a": 1, "b": 2})), json!({"c": {"d": [1, 2]}})),
        (Some(json!("hello")), json!(" world")),
        (Some(json!(8)), json!(4)),
        (None, json!("not a number")),
        (Some(json!(["wrong"])), json!({"a": 1})),
    ]
}

#[test]
fn test_transform_never_mutates_inputs() {
    for definition in schemas() {
        let schema = Schema::compile(&definition).unwrap();
        for (target, value) in cases() {
            let target_before = target.as_ref().map(|t| serde_json::to_string(t).unwrap());
            let value_before = serde_json::to_string(&value).unwrap();

            let _ = schema.transform(target.as_ref(), &value);

            assert_eq!(target.as_ref().map(|t| serde_json::to_string(t).unwrap()), target_before);
            assert_eq!(serde_json::to_string(&value).unwrap(), value_before);
        }
    }
}

#[test]
fn test_transform_output_validates() {
    let mut successes = 0;
    for definition in schemas() {
        let schema = Schema::compile(&definition).unwrap();
        for (target, value) in cases() {
            if let Ok(out) = schema.transform(target.as_ref(), &value) {
                successes += 1;
                assert!(
                    schema.validate(&out, &JsonPath::root()).is_success(),
                    "{} produced invalid {}",
                    definition,
                    out
                );
            }
        }
    }
    assert!(successes >= 5);
}

#[test]
fn test_ad_hoc_transform_deep_copies() {
    let schema = Schema::compile(&json!({".type": "object", ".adHoc": true})).unwrap();
    let doc = json!({
        "a": [1, {"b": null}],
        "c": {"d": {"e": "f"}},
        "g": 1.5
    });
    assert_eq!(schema.transform(Some(&json!({})), &doc).unwrap(), doc);
    assert_eq!(schema.transform(None, &doc).unwrap(), doc);
}

#[test]
fn test_clip_keeps_newest_or_oldest_keys() {
    let target = json!({"able": 1, "baker": 2});
    let value = json!({"charlie": 3, "dog": 4});

    let newest = Schema::compile(&json!({".type": "object", ".adHoc": true, ".clip": 3}))
        .unwrap()
        .transform(Some(&target), &value)
        .unwrap();
    let keys: Vec<_> = newest.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["baker", "charlie", "dog"]);

    let oldest = Schema::compile(&json!({".type": "object", ".adHoc": true, ".clip": -3}))
        .unwrap()
        .transform(Some(&target), &value)
        .unwrap();
    let keys: Vec<_> = oldest.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["able", "baker", "charlie"]);
}

#[test]
fn test_one_of_exclusivity() {
    let schema = Schema::compile(&json!({
        ".oneOf": [
            {".type": "string", ".append": true},
            {".type": "string", ".prepend": true}
        ]
    }))
    .unwrap();
    let err = schema.transform(Some(&json!("a")), &json!("b")).unwrap_err();
    assert!(err.message.contains("too many matching"));

    let schema = Schema::compile(&json!({
        ".oneOf": [{".type": "string", ".max": 1}, {".type": "string", ".min": 2}]
    }))
    .unwrap();
    assert_eq!(schema.transform(None, &json!("ab")).unwrap(), json!("ab"));
}

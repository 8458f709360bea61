//! Tests for merging values into targets.

use schemata::{Registry, Schema};
use serde_json::{json, Value};

fn run(schema: Value, target: Option<Value>, value: Value) -> Result<Value, schemata::TransformError> {
    Schema::compile(&schema).unwrap().transform(target.as_ref(), &value)
}

#[test]
fn test_type_array_selects_by_value_class() {
    let schema = json!({".type": ["string", "array"], ".append": true});

    assert_eq!(
        run(schema.clone(), Some(json!("foo")), json!("bar")).unwrap(),
        json!("foobar")
    );
    assert_eq!(
        run(schema.clone(), Some(json!(["foo"])), json!(["bar"])).unwrap(),
        json!(["foo", "bar"])
    );
    let err = run(schema, Some(json!(["foo"])), json!("bar")).unwrap_err();
    assert!(err.message.contains("cannot merge"));
}

#[test]
fn test_object_merge_keeps_target_keys() {
    let schema = json!({
        "name": {".type": "string"},
        "visits": {".type": "integer", ".add": true},
        "nickname": {".type": "string", ".optional": true}
    });
    let out = run(
        schema,
        Some(json!({"name": "ada", "visits": 2, "nickname": "a"})),
        json!({"visits": 3}),
    )
    .unwrap();
    assert_eq!(out, json!({"name": "ada", "visits": 5, "nickname": "a"}));
}

#[test]
fn test_incomplete_object_fails() {
    let schema = json!({"name": {".type": "string"}, "age": {".type": "integer"}});
    let err = run(schema, None, json!({"name": "ada"})).unwrap_err();
    assert_eq!(err.message, "final Object is incomplete: missing 'age'");
    assert_eq!(err.path.to_string(), "age");
}

#[test]
fn test_default_fills_missing_child() {
    let schema = json!({"name": {".type": "string"}, "role": {".type": "string", ".default": "user"}});
    assert_eq!(
        run(schema, None, json!({"name": "ada"})).unwrap(),
        json!({"name": "ada", "role": "user"})
    );
}

#[test]
fn test_rename_and_drop() {
    let schema = json!({
        ".type": "object",
        ".rename": {"fullName": "name"},
        ".drop": ["password"],
        "name": {".type": "string"},
        "email": {".type": "string"}
    });
    let out = run(
        schema,
        None,
        json!({"fullName": "Ada Lovelace", "password": "x", "email": "ada@example.com"}),
    )
    .unwrap();
    assert_eq!(out, json!({"email": "ada@example.com", "name": "Ada Lovelace"}));
    let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["email", "name"]);
}

#[test]
fn test_unknown_key_fails_unless_tolerated() {
    let schema = json!({"a": {".type": "number"}});
    let err = run(schema, None, json!({"a": 1, "b": 2})).unwrap_err();
    assert_eq!(err.message, "found unknown key 'b'");

    let tolerant = json!({".tolerant": true, "a": {".type": "number"}});
    assert_eq!(run(tolerant, None, json!({"a": 1, "b": 2})).unwrap(), json!({"a": 1}));
}

#[test]
fn test_array_merge_strategies() {
    let target = Some(json!([1, 2]));
    assert_eq!(
        run(json!({".type": "array", ".append": true}), target.clone(), json!([3])).unwrap(),
        json!([1, 2, 3])
    );
    assert_eq!(
        run(json!({".type": "array", ".prepend": true}), target.clone(), json!([3])).unwrap(),
        json!([3, 1, 2])
    );
    assert_eq!(
        run(json!({".type": "array", ".insert": 1}), target.clone(), json!([3])).unwrap(),
        json!([1, 3, 2])
    );
    assert_eq!(
        run(json!({".type": "array"}), target, json!([3])).unwrap(),
        json!([3])
    );
}

#[test]
fn test_array_unique_append_skips_known_items() {
    let schema = json!({".type": "array", ".append": true, ".unique": true});
    assert_eq!(
        run(schema, Some(json!(["a", "b"])), json!(["b", "c", "c"])).unwrap(),
        json!(["a", "b", "c"])
    );
}

#[test]
fn test_array_unique_filters_against_target() {
    let schema = json!({".type": "array", ".unique": true, ".all": {".type": "number"}});
    let out = run(schema.clone(), Some(json!([1, 2, 3])), json!([2])).unwrap();
    assert_eq!(out, json!([1, 2, 3]));
    assert!(Schema::compile(&schema).unwrap().validate(&out, &schemata::JsonPath::root()).is_success());

    let replace = json!({".type": "array", ".unique": true});
    assert_eq!(run(replace, Some(json!([1, 2])), json!([2, 3])).unwrap(), json!([3]));
}

#[test]
fn test_clipped_object_still_validates() {
    let schema = json!({"a": {".type": "number"}, ".adHoc": true, ".clip": 1});
    let err = run(schema, None, json!({"a": 1, "b": 2})).unwrap_err();
    assert_eq!(err.message, "final Object is incomplete: missing 'a'");
}

#[test]
fn test_integer_or_number_picks_by_result() {
    let schema = json!({".type": ["integer", "number"], ".normal": 2});
    assert_eq!(run(schema.clone(), None, json!(3)).unwrap(), json!(1.5));
    assert_eq!(run(schema, None, json!(8)).unwrap(), json!(4));
}

#[test]
fn test_array_sort_and_clip() {
    let schema = json!({".type": "array", ".append": true, ".sort": "desc", ".clip": 3});
    assert_eq!(
        run(schema, Some(json!([5, 1])), json!([3, 9])).unwrap(),
        json!([5, 3, 1])
    );
}

#[test]
fn test_array_max_without_clip_fails() {
    let schema = json!({".type": "array", ".append": true, ".max": 3});
    let err = run(schema, Some(json!([1, 2])), json!([3, 4])).unwrap_err();
    assert!(err.message.contains("exceed maximum 3"));
}

#[test]
fn test_sequence_positional_transform() {
    let schema = json!({".sequence": [{".type": "string", ".case": "upper"}, {".type": "number", ".add": true}]});
    assert_eq!(
        run(schema.clone(), Some(json!(["x", 10])), json!(["a", 5])).unwrap(),
        json!(["A", 15])
    );
    let err = run(schema, None, json!(["a", 5, true])).unwrap_err();
    assert_eq!(err.message, "found unexpected array item");
}

#[test]
fn test_string_operations() {
    assert_eq!(
        run(json!({".type": "string", ".case": "lower", ".prepend": true}), Some(json!("World")), json!("HELLO ")).unwrap(),
        json!("hello World")
    );
    assert_eq!(
        run(json!({".type": "string", ".partial": [0, 3]}), None, json!("abcdef")).unwrap(),
        json!("abc")
    );
    let err = run(json!({".type": "string", ".append": true, ".max": 4}), Some(json!("abc")), json!("de")).unwrap_err();
    assert!(err.path.is_root());
}

#[test]
fn test_number_operations() {
    assert_eq!(run(json!({".type": "number", ".subtract": true}), Some(json!(10)), json!(4)).unwrap(), json!(6));
    assert_eq!(run(json!({".type": "number", ".multiply": true}), Some(json!(3)), json!(4)).unwrap(), json!(12));
    assert_eq!(run(json!({".type": "number", ".divide": true}), Some(json!(10)), json!(4)).unwrap(), json!(2.5));
    assert_eq!(run(json!({".type": "number", ".average": true}), Some(json!(10)), json!(20)).unwrap(), json!(15));
    assert_eq!(run(json!({".type": "number", ".inverse": true}), None, json!(4)).unwrap(), json!(-4));
    assert_eq!(run(json!({".type": "number", ".reciprocal": true}), None, json!(4)).unwrap(), json!(0.25));
    assert!(run(json!({".type": "number", ".divide": true}), Some(json!(1)), json!(0)).is_err());
}

#[test]
fn test_cast_and_split() {
    assert_eq!(run(json!({".type": "number", ".cast": true}), None, json!("42")).unwrap(), json!(42));
    assert_eq!(run(json!({".type": "string", ".cast": true}), None, json!(42)).unwrap(), json!("42"));
    assert_eq!(
        run(json!({".type": "array", ".split": ","}), None, json!("a,b,c")).unwrap(),
        json!(["a", "b", "c"])
    );
}

#[test]
fn test_date_extraction() {
    assert_eq!(run(json!({".getYear": true}), None, json!("2024-03-15")).unwrap(), json!(2024));
    assert_eq!(run(json!({".getMonthName": true}), None, json!("2024-03-15")).unwrap(), json!("March"));
    assert_eq!(run(json!({".getDayName": true}), None, json!("2024-03-15")).unwrap(), json!("Friday"));
    assert!(run(json!({".getYear": true}), None, json!("not a date")).is_err());
}

#[test]
fn test_one_of_too_many_matching() {
    let schema = json!({".oneOf": [{".type": "number"}, {".type": "number", ".max": 100}]});
    let err = run(schema, None, json!(5)).unwrap_err();
    assert_eq!(err.message, "too many matching schemata for .oneOf");
}

#[test]
fn test_error_override_on_transform() {
    let schema = json!({
        ".error": "bad profile",
        "age": {".type": "integer", ".min": 0, ".error": "age must be positive"},
        "name": {".type": "string"}
    });
    let err = run(schema.clone(), None, json!({"age": -1, "name": "x"})).unwrap_err();
    assert_eq!(err.message, "age must be positive");
    let err = run(schema, None, json!({"age": 1})).unwrap_err();
    assert_eq!(err.message, "bad profile");
}

#[test]
fn test_registered_transform_function() {
    let registry = Registry::new();
    registry
        .register_transform("max", |target, value| {
            let prior = target.and_then(Value::as_f64).unwrap_or(f64::MIN);
            let next = value.as_f64().ok_or_else(|| "expected a number".to_string())?;
            Ok(json!(prior.max(next)))
        })
        .unwrap();
    let schema = Schema::compiler()
        .with_registry(&registry)
        .compile(&json!({".type": "number", ".transform": "max"}))
        .unwrap();

    assert_eq!(schema.transform(Some(&json!(7.0)), &json!(3.0)).unwrap(), json!(7.0));
    let err = schema.transform(None, &json!("x")).unwrap_err();
    assert_eq!(err.message, "transform function failed");
}

#[test]
fn test_null_target_is_absent() {
    let schema = json!({".type": "array", ".append": true});
    assert_eq!(run(schema, Some(json!(null)), json!([1])).unwrap(), json!([1]));
}

//! Tests for the two-phase asynchronous eval protocol.

use schemata::{CheckResults, ErrorKind, JsonPath, Registry};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn registry_with(calls: Arc<AtomicUsize>) -> Registry {
    let registry = Registry::new();
    registry
        .register_predicate("available", move |v| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(v.as_str() != Some("taken"))
        })
        .unwrap();
    registry
        .register_schema(
            "Signup",
            &json!({
                "username": {".type": "string", ".min": 3, ".eval": "available", ".async": true},
                "aliases": {
                    ".type": "array",
                    ".optional": true,
                    ".all": {".type": "string", ".eval": "available", ".async": true}
                }
            }),
        )
        .unwrap();
    registry
}

#[test]
fn test_collect_does_not_invoke_predicates() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = registry_with(Arc::clone(&calls));
    let schema = registry.get_schema("Signup").unwrap();

    let pending = schema.collect_deferred(
        &json!({"username": "ada", "aliases": ["a1", "a2"]}),
        &JsonPath::root(),
    );
    assert_eq!(pending.len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    pending.run();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_two_phase_matches_expected_outcome() {
    let registry = registry_with(Arc::new(AtomicUsize::new(0)));
    let schema = registry.get_schema("Signup").unwrap();

    let ok = json!({"username": "ada", "aliases": ["lovelace"]});
    let results = schema.collect_deferred(&ok, &JsonPath::root()).run_parallel();
    assert!(schema.validate_resolved(&ok, &JsonPath::root(), &results).is_success());

    let taken = json!({"username": "ada", "aliases": ["taken", "free"]});
    let results = schema.collect_deferred(&taken, &JsonPath::root()).run_parallel();
    let errors = schema
        .validate_resolved(&taken, &JsonPath::root(), &results)
        .into_result()
        .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.first().path.to_string(), "aliases[0]");
}

#[test]
fn test_structural_failures_skip_deferred_checks() {
    let registry = registry_with(Arc::new(AtomicUsize::new(0)));
    let schema = registry.get_schema("Signup").unwrap();

    let short = json!({"username": "ab"});
    let pending = schema.collect_deferred(&short, &JsonPath::root());
    assert!(pending.is_empty());
    let errors = schema
        .validate_resolved(&short, &JsonPath::root(), &pending.run())
        .into_result()
        .unwrap_err();
    assert_eq!(errors.first().kind, ErrorKind::Limit);
}

#[test]
fn test_unresolved_check_is_sync_error() {
    let registry = registry_with(Arc::new(AtomicUsize::new(0)));
    let schema = registry.get_schema("Signup").unwrap();

    let errors = schema
        .validate_resolved(&json!({"username": "ada"}), &JsonPath::root(), &CheckResults::new())
        .into_result()
        .unwrap_err();
    assert_eq!(errors.first().kind, ErrorKind::Sync);

    let errors = registry
        .validate("Signup", &json!({"username": "ada"}))
        .unwrap()
        .into_result()
        .unwrap_err();
    assert_eq!(errors.first().kind, ErrorKind::Sync);
}

#[test]
fn test_transform_refuses_async_eval() {
    let registry = registry_with(Arc::new(AtomicUsize::new(0)));
    let err = registry
        .transform("Signup", None, &json!({"username": "ada"}))
        .unwrap()
        .unwrap_err();
    assert!(err.message.contains("cannot run during a transform"));
}

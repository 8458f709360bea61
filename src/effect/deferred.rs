//! Two-phase checking for `async` eval predicates.
//!
//! Phase one walks the document in collect mode and records every deferred
//! predicate invocation the walk reaches, treating each as passing. The
//! caller then resolves the batch however it likes (inline, on a rayon pool,
//! or from results fetched elsewhere) and phase two re-runs the ordinary
//! synchronous validation, reading each deferred outcome from the results.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde_json::Value;

use crate::context::{ValidationContext, DEFAULT_MAX_DEPTH};
use crate::path::JsonPath;
use crate::schema::{NodeId, Predicate, SchemaNode};
use crate::ValidationResult;

/// One deferred predicate invocation awaiting an outcome.
#[derive(Clone)]
pub struct PendingCheck {
    node: NodeId,
    path: JsonPath,
    value: Value,
    predicate: Predicate,
}

impl PendingCheck {
    pub(crate) fn new(node: NodeId, path: JsonPath, value: Value, predicate: Predicate) -> Self {
        Self {
            node,
            path,
            value,
            predicate,
        }
    }

    /// The node whose `eval` produced this check.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Where in the document the checked value sits.
    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    /// The value to check.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Invokes the predicate.
    pub fn run(&self) -> Result<bool, String> {
        (self.predicate)(&self.value)
    }
}

impl std::fmt::Debug for PendingCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCheck")
            .field("node", &self.node)
            .field("path", &self.path)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

/// The deferred checks one document needs, in the order they were reached.
#[derive(Debug, Clone, Default)]
pub struct PendingChecks(Vec<PendingCheck>);

impl PendingChecks {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingCheck> {
        self.0.iter()
    }

    /// Runs every check on the current thread.
    pub fn run(&self) -> CheckResults {
        tracing::debug!(checks = self.0.len(), "running deferred checks");
        CheckResults(
            self.0
                .iter()
                .map(|check| ((check.node, check.path.clone()), check.run()))
                .collect(),
        )
    }

    /// Runs the checks in parallel on the rayon thread pool.
    pub fn run_parallel(&self) -> CheckResults {
        tracing::debug!(checks = self.0.len(), "running deferred checks in parallel");
        CheckResults(
            self.0
                .par_iter()
                .map(|check| ((check.node, check.path.clone()), check.run()))
                .collect(),
        )
    }
}

impl IntoIterator for PendingChecks {
    type Item = PendingCheck;
    type IntoIter = std::vec::IntoIter<PendingCheck>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Outcomes of deferred checks, keyed by node and document path.
#[derive(Debug, Clone, Default)]
pub struct CheckResults(HashMap<(NodeId, JsonPath), Result<bool, String>>);

impl CheckResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of a check; `Err` carries the failure cause.
    pub fn insert(&mut self, node: NodeId, path: JsonPath, outcome: Result<bool, String>) {
        self.0.insert((node, path), outcome);
    }

    pub fn get(&self, node: NodeId, path: &JsonPath) -> Option<&Result<bool, String>> {
        self.0.get(&(node, path.clone()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl SchemaNode {
    /// Phase one: returns the deferred checks validating `value` requires.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemata::{JsonPath, Registry};
    /// use serde_json::json;
    ///
    /// let registry = Registry::new();
    /// registry
    ///     .register_predicate("available", |v| Ok(v.as_str() != Some("taken")))
    ///     .unwrap();
    /// registry
    ///     .register_schema("user", &json!({"name": {".type": "string", ".eval": "available", ".async": true}}))
    ///     .unwrap();
    /// let schema = registry.get_schema("user").unwrap();
    ///
    /// let doc = json!({"name": "taken"});
    /// let pending = schema.collect_deferred(&doc, &JsonPath::root());
    /// assert_eq!(pending.len(), 1);
    ///
    /// let results = pending.run_parallel();
    /// assert!(schema.validate_resolved(&doc, &JsonPath::root(), &results).is_failure());
    /// ```
    pub fn collect_deferred(&self, value: &Value, path: &JsonPath) -> PendingChecks {
        let cx = ValidationContext::collecting(DEFAULT_MAX_DEPTH);
        self.check(Some(value), path, &cx, None);

        let mut seen = HashSet::new();
        let checks: Vec<PendingCheck> = cx
            .into_pending()
            .into_iter()
            .filter(|check| seen.insert((check.node, check.path.clone())))
            .collect();
        tracing::debug!(path = %path, checks = checks.len(), "collected deferred checks");
        PendingChecks(checks)
    }

    /// Phase two: validates `value`, reading deferred outcomes from `results`.
    ///
    /// A deferred predicate with no recorded outcome is a `SYNC` error.
    pub fn validate_resolved(
        &self,
        value: &Value,
        path: &JsonPath,
        results: &CheckResults,
    ) -> ValidationResult<()> {
        let cx = ValidationContext::resolved(results, DEFAULT_MAX_DEPTH);
        self.validate_in(Some(value), path, &cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::Registry;
    use serde_json::json;

    fn schema(definition: Value) -> std::sync::Arc<SchemaNode> {
        let registry = Registry::new();
        registry
            .register_predicate("short", |v| Ok(v.as_str().is_some_and(|s| s.len() < 4)))
            .unwrap();
        registry.register_schema("s", &definition).unwrap();
        registry.get_schema("s").unwrap()
    }

    #[test]
    fn test_collect_dedupes_by_node_and_path() {
        let node = schema(json!({
            ".type": "array",
            ".all": {".type": "string", ".eval": "short", ".async": true}
        }));
        let pending = node.collect_deferred(&json!(["a", "bbbbb", "c"]), &JsonPath::root());
        assert_eq!(pending.len(), 3);
        let paths: Vec<_> = pending.iter().map(|c| c.path().to_string()).collect();
        assert_eq!(paths, vec!["[0]", "[1]", "[2]"]);
    }

    #[test]
    fn test_resolved_outcomes_drive_validation() {
        let node = schema(json!({".type": "string", ".eval": "short", ".async": true}));
        let doc = json!("toolong");
        let results = node.collect_deferred(&doc, &JsonPath::root()).run();
        let errors = node
            .validate_resolved(&doc, &JsonPath::root(), &results)
            .into_result()
            .unwrap_err();
        assert_eq!(errors.first().kind, ErrorKind::Invalid);

        let doc = json!("ok");
        let results = node.collect_deferred(&doc, &JsonPath::root()).run();
        assert!(node.validate_resolved(&doc, &JsonPath::root(), &results).is_success());
    }

    #[test]
    fn test_missing_outcome_is_sync_error() {
        let node = schema(json!({".type": "string", ".eval": "short", ".async": true}));
        let errors = node
            .validate_resolved(&json!("ok"), &JsonPath::root(), &CheckResults::new())
            .into_result()
            .unwrap_err();
        assert_eq!(errors.first().kind, ErrorKind::Sync);
    }

    #[test]
    fn test_plain_validate_rejects_async_eval() {
        let node = schema(json!({".type": "string", ".eval": "short", ".async": true}));
        let errors = node
            .validate(&json!("ok"), &JsonPath::root())
            .into_result()
            .unwrap_err();
        assert_eq!(errors.first().kind, ErrorKind::Sync);
    }

    #[test]
    fn test_custom_outcomes() {
        let node = schema(json!({".type": "string", ".eval": "short", ".async": true}));
        let doc = json!("ok");
        let pending = node.collect_deferred(&doc, &JsonPath::root());
        let mut results = CheckResults::new();
        for check in pending.iter() {
            results.insert(check.node_id(), check.path().clone(), Err("service unavailable".to_string()));
        }
        let errors = node
            .validate_resolved(&doc, &JsonPath::root(), &results)
            .into_result()
            .unwrap_err();
        assert_eq!(errors.first().cause.as_deref(), Some("service unavailable"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let node = schema(json!({".type": "array", ".all": {".eval": "short", ".async": true}}));
        let doc = json!(["a", "bbbbbb", "cc", "dddddd"]);
        let pending = node.collect_deferred(&doc, &JsonPath::root());
        let sequential = node
            .validate_resolved(&doc, &JsonPath::root(), &pending.run())
            .into_result();
        let parallel = node
            .validate_resolved(&doc, &JsonPath::root(), &pending.run_parallel())
            .into_result();
        assert_eq!(sequential, parallel);
    }
}

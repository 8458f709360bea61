//! Named function and schema registry.
//!
//! This module provides the [`Registry`] type. It stores the `eval`
//! predicates and `transform` functions that definitions refer to by name,
//! along with compiled schemas that can then be validated, transformed and
//! accumulated by name.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{TransformContext, ValidationContext, DEFAULT_MAX_DEPTH};
use crate::error::TransformError;
use crate::path::JsonPath;
use crate::schema::{CompileError, Compiler, Predicate, SchemaNode, TransformFn};
use crate::ValidationResult;

type Shared<T> = Arc<RwLock<HashMap<String, T>>>;

/// A thread-safe registry of named functions and schemas.
///
/// # Thread Safety
///
/// The registry uses `Arc<RwLock<...>>` for thread-safe access:
/// - Multiple threads can look up and evaluate concurrently (read access)
/// - Registration operations are serialized (write access)
///
/// Clones share the same storage.
///
/// # Example
///
/// ```rust
/// use schemata::Registry;
/// use serde_json::json;
///
/// let registry = Registry::new();
/// registry
///     .register_predicate("even", |v| Ok(v.as_i64().is_some_and(|n| n % 2 == 0)))
///     .unwrap();
/// registry
///     .register_schema("Pair", &json!({"a": {".type": "integer", ".eval": "even"}}))
///     .unwrap();
///
/// assert!(registry.validate("Pair", &json!({"a": 2})).unwrap().is_success());
/// assert!(registry.validate("Pair", &json!({"a": 3})).unwrap().is_failure());
/// ```
pub struct Registry {
    predicates: Shared<Predicate>,
    transforms: Shared<TransformFn>,
    schemas: Shared<Arc<SchemaNode>>,
    max_depth: usize,
}

impl Registry {
    /// Creates an empty registry with the default max depth (100).
    pub fn new() -> Self {
        Self {
            predicates: Arc::new(RwLock::new(HashMap::new())),
            transforms: Arc::new(RwLock::new(HashMap::new())),
            schemas: Arc::new(RwLock::new(HashMap::new())),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the maximum evaluation depth for schemas run through this registry.
    ///
    /// When a `recurse` chain nests deeper than this, validation fails with a
    /// `LIMIT` error and transforms fail outright.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemata::Registry;
    ///
    /// let registry = Registry::new().with_max_depth(50);
    /// ```
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Registers an `eval` predicate.
    ///
    /// The predicate returns `Ok(true)` to accept, `Ok(false)` to reject, or
    /// `Err(cause)` to reject with the cause attached to the error.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateName` if the name is already registered.
    pub fn register_predicate<F>(&self, name: impl Into<String>, predicate: F) -> Result<(), RegistryError>
    where
        F: Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        let predicate: Predicate = Arc::new(predicate);
        insert(&self.predicates, "predicate", name.into(), predicate)
    }

    /// Registers a `transform` function, called with the prior target and
    /// the new value.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateName` if the name is already registered.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemata::Registry;
    /// use serde_json::{json, Value};
    ///
    /// let registry = Registry::new();
    /// registry
    ///     .register_transform("trim", |_, v| {
    ///         v.as_str()
    ///             .map(|s| Value::from(s.trim()))
    ///             .ok_or_else(|| "expected a string".to_string())
    ///     })
    ///     .unwrap();
    /// registry.register_schema("Name", &json!({".type": "string", ".transform": "trim"})).unwrap();
    ///
    /// let out = registry.transform("Name", None, &json!("  ada ")).unwrap();
    /// assert_eq!(out.unwrap(), json!("ada"));
    /// ```
    pub fn register_transform<F>(&self, name: impl Into<String>, transform: F) -> Result<(), RegistryError>
    where
        F: Fn(Option<&Value>, &Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let transform: TransformFn = Arc::new(transform);
        insert(&self.transforms, "transform", name.into(), transform)
    }

    /// Compiles `definition` against this registry's functions and stores it.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Compile` if the definition is malformed and
    /// `RegistryError::DuplicateName` if the name is already registered.
    pub fn register_schema(&self, name: impl Into<String>, definition: &Value) -> Result<(), RegistryError> {
        let node = Compiler::new().with_registry(self).compile(definition)?;
        insert(&self.schemas, "schema", name.into(), Arc::new(node))
    }

    /// Retrieves a compiled schema by name.
    pub fn get_schema(&self, name: &str) -> Option<Arc<SchemaNode>> {
        self.schemas.read().get(name).cloned()
    }

    pub fn predicate(&self, name: &str) -> Option<Predicate> {
        self.predicates.read().get(name).cloned()
    }

    pub fn transform_fn(&self, name: &str) -> Option<TransformFn> {
        self.transforms.read().get(name).cloned()
    }

    /// Validates a value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::SchemaNotFound` if the schema name doesn't exist.
    pub fn validate(&self, schema_name: &str, value: &Value) -> Result<ValidationResult<()>, RegistryError> {
        let schema = self.require(schema_name)?;
        let cx = ValidationContext::strict(self.max_depth);
        Ok(schema.validate_in(Some(value), &JsonPath::root(), &cx))
    }

    /// Transforms `value` into `target` with a named schema.
    ///
    /// The outer `Result` reports a missing schema; the inner one is the
    /// transform outcome.
    pub fn transform(
        &self,
        schema_name: &str,
        target: Option<&Value>,
        value: &Value,
    ) -> Result<Result<Value, TransformError>, RegistryError> {
        let schema = self.require(schema_name)?;
        let cx = TransformContext::new(value, self.max_depth);
        Ok(schema.apply(target, value, &JsonPath::root(), &cx, None))
    }

    /// Accumulates into `target` with a named schema, resolving sources against `root`.
    pub fn accumulate(
        &self,
        schema_name: &str,
        target: Option<&Value>,
        value: Option<&Value>,
        root: &Value,
    ) -> Result<Result<Option<Value>, TransformError>, RegistryError> {
        let schema = self.require(schema_name)?;
        let cx = TransformContext::new(root, self.max_depth);
        Ok(schema.gather(target, value, &JsonPath::root(), &cx, None))
    }

    fn require(&self, name: &str) -> Result<Arc<SchemaNode>, RegistryError> {
        self.get_schema(name)
            .ok_or_else(|| RegistryError::SchemaNotFound(name.to_string()))
    }
}

fn insert<T>(map: &Shared<T>, what: &'static str, name: String, item: T) -> Result<(), RegistryError> {
    let mut entries = map.write();
    if entries.contains_key(&name) {
        return Err(RegistryError::DuplicateName { kind: what, name });
    }
    tracing::debug!(kind = what, name = %name, "registered");
    entries.insert(name, item);
    Ok(())
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        Self {
            predicates: Arc::clone(&self.predicates),
            transforms: Arc::clone(&self.transforms),
            schemas: Arc::clone(&self.schemas),
            max_depth: self.max_depth,
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("predicates", &self.predicates.read().keys().collect::<Vec<_>>())
            .field("transforms", &self.transforms.read().keys().collect::<Vec<_>>())
            .field("schemas", &self.schemas.read().keys().collect::<Vec<_>>())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Attempted to register a name that already exists.
    #[error("{kind} '{name}' already registered")]
    DuplicateName { kind: &'static str, name: String },

    /// Looked up a schema name that doesn't exist.
    #[error("schema '{0}' not found")]
    SchemaNotFound(String),

    /// The definition passed to `register_schema` failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_names_are_per_kind() {
        let registry = Registry::new();
        registry.register_predicate("x", |_| Ok(true)).unwrap();
        registry.register_transform("x", |_, v| Ok(v.clone())).unwrap();
        registry.register_schema("x", &json!({".type": "string"})).unwrap();

        let err = registry.register_predicate("x", |_| Ok(false)).unwrap_err();
        assert_eq!(err.to_string(), "predicate 'x' already registered");
        let err = registry.register_schema("x", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "schema 'x' already registered");
    }

    #[test]
    fn test_schema_not_found() {
        let registry = Registry::new();
        let err = registry.validate("Missing", &json!(1)).err();
        assert!(matches!(err, Some(RegistryError::SchemaNotFound(ref n)) if n == "Missing"));
    }

    #[test]
    fn test_compile_errors_surface() {
        let registry = Registry::new();
        let err = registry
            .register_schema("Bad", &json!({".eval": "nowhere"}))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Compile(CompileError::UnknownFunction(_))));
        assert!(registry.get_schema("Bad").is_none());
    }

    #[test]
    fn test_clones_share_storage() {
        let registry = Registry::new();
        let clone = registry.clone();
        clone.register_schema("S", &json!({".type": "null"})).unwrap();
        assert!(registry.get_schema("S").is_some());
    }

    #[test]
    fn test_max_depth_bounds_recursion() {
        let registry = Registry::new().with_max_depth(3);
        registry
            .register_schema("Tree", &json!({"child": {".optional": true, ".recurse": 1}}))
            .unwrap();

        let shallow = json!({"child": {}});
        assert!(registry.validate("Tree", &shallow).unwrap().is_success());

        let deep = json!({"child": {"child": {"child": {"child": {}}}}});
        let errors = registry.validate("Tree", &deep).unwrap().into_result().unwrap_err();
        assert_eq!(errors.first().kind, crate::error::ErrorKind::Limit);

        let err = registry.transform("Tree", None, &deep).unwrap().unwrap_err();
        assert!(err.message.contains("depth"));
    }
}

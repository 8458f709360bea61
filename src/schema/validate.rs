//! Node-level validation and type dispatch.

use serde_json::Value;
use stillwater::Validation;

use crate::context::{Deferred, Frame, ValidationContext, DEFAULT_MAX_DEPTH};
use crate::effect::PendingCheck;
use crate::error::{ErrorKind, SchemaError, SchemaErrors};
use crate::path::JsonPath;
use crate::ValidationResult;

use super::constraints::{Constraints, TypeTag};
use super::{render, render_number, SchemaNode};

impl SchemaNode {
    /// Validates a value, accumulating every failure.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemata::{ErrorKind, JsonPath, Schema};
    /// use serde_json::json;
    ///
    /// let schema = Schema::compile(&json!({
    ///     "name": {".type": "string", ".min": 1},
    ///     "age": {".type": "integer", ".min": 0}
    /// })).unwrap();
    ///
    /// let result = schema.validate(&json!({"name": "", "age": -1}), &JsonPath::root());
    /// let errors = result.into_result().unwrap_err();
    /// assert_eq!(errors.len(), 2);
    /// assert_eq!(errors.with_kind(ErrorKind::Limit).len(), 2);
    /// ```
    pub fn validate(&self, value: &Value, path: &JsonPath) -> ValidationResult<()> {
        self.validate_option(Some(value), path)
    }

    /// Validates a possibly absent value; absence passes only for optional nodes.
    pub fn validate_option(&self, value: Option<&Value>, path: &JsonPath) -> ValidationResult<()> {
        let cx = ValidationContext::strict(DEFAULT_MAX_DEPTH);
        self.validate_in(value, path, &cx)
    }

    pub(crate) fn validate_in(
        &self,
        value: Option<&Value>,
        path: &JsonPath,
        cx: &ValidationContext<'_>,
    ) -> ValidationResult<()> {
        finish(self.check(value, path, cx, None))
    }

    /// True if `value` satisfies this node.
    pub(crate) fn passes(
        &self,
        value: &Value,
        path: &JsonPath,
        cx: &ValidationContext<'_>,
        parent: Option<&Frame<'_>>,
    ) -> bool {
        self.check(Some(value), path, cx, parent).is_empty()
    }

    /// Runs every check of this node and returns the failures, with this
    /// node's `error` message applied to any not already overridden below.
    pub(crate) fn check(
        &self,
        value: Option<&Value>,
        path: &JsonPath,
        cx: &ValidationContext<'_>,
        parent: Option<&Frame<'_>>,
    ) -> Vec<SchemaError> {
        let frame = Frame::enter(self, parent);
        let mut errors = self.check_in(value, path, cx, &frame);
        if let Some(message) = &self.constraints.error {
            for error in &mut errors {
                error.override_message(message);
            }
        }
        errors
    }

    fn check_in(
        &self,
        value: Option<&Value>,
        path: &JsonPath,
        cx: &ValidationContext<'_>,
        frame: &Frame<'_>,
    ) -> Vec<SchemaError> {
        let c = &self.constraints;

        if frame.depth() > cx.max_depth {
            return vec![depth_exceeded(path, cx.max_depth)];
        }
        if value.is_none() && c.optional {
            return Vec::new();
        }
        if let Some(levels) = c.recurse {
            return match frame.ancestor(levels) {
                Some(node) => node.check(value, path, cx, Some(frame)),
                None => vec![SchemaError::new(
                    path.clone(),
                    format!(".recurse distance {} reaches past the root schema", levels),
                )],
            };
        }

        let Some(value) = value else {
            return vec![SchemaError::new(path.clone(), "required value is missing")
                .with_kind(ErrorKind::Missing)
                .with_expected(c.type_names())];
        };

        if c.invalid {
            return vec![SchemaError::new(path.clone(), "value is not allowed here")
                .with_got(render(value))];
        }
        if !c.admits(value) {
            return vec![SchemaError::new(
                path.clone(),
                format!("expected {}, got {}", c.type_names(), TypeTag::of(value)),
            )
            .with_kind(ErrorKind::Type)
            .with_expected(c.type_names())
            .with_got(render(value))];
        }

        let mut errors = match value {
            Value::Object(map) => self.validate_object(value, map, path, cx, frame),
            Value::Array(items) => self.validate_array(items, path, cx, frame),
            Value::String(s) => self.validate_string(s, path),
            Value::Number(n) => self.validate_number(n.as_f64().unwrap_or(f64::NAN), path),
            Value::Bool(_) | Value::Null => Vec::new(),
        };

        if errors.is_empty() {
            errors.extend(self.check_eval(value, path, cx));
        }
        errors.extend(self.check_combinators(value, path, cx, frame));
        errors
    }

    fn check_eval(&self, value: &Value, path: &JsonPath, cx: &ValidationContext<'_>) -> Vec<SchemaError> {
        let Some(eval) = &self.constraints.eval else {
            return Vec::new();
        };
        if !eval.deferred {
            return eval_outcome(&eval.name, (eval.predicate)(value), value, path);
        }
        match &cx.deferred {
            Deferred::Reject => vec![SchemaError::new(
                path.clone(),
                format!("asynchronous .eval '{}' reached during synchronous validation", eval.name),
            )
            .with_kind(ErrorKind::Sync)],
            Deferred::Collect(pending) => {
                pending.borrow_mut().push(PendingCheck::new(
                    self.id(),
                    path.clone(),
                    value.clone(),
                    eval.predicate.clone(),
                ));
                Vec::new()
            }
            Deferred::Resolved(results) => match results.get(self.id(), path) {
                Some(outcome) => eval_outcome(&eval.name, outcome.clone(), value, path),
                None => vec![SchemaError::new(
                    path.clone(),
                    format!("no resolved outcome for asynchronous .eval '{}'", eval.name),
                )
                .with_kind(ErrorKind::Sync)],
            },
        }
    }
}

fn eval_outcome(
    name: &str,
    outcome: Result<bool, String>,
    value: &Value,
    path: &JsonPath,
) -> Vec<SchemaError> {
    let rejected = || {
        SchemaError::new(path.clone(), format!("value rejected by .eval '{}'", name))
            .with_got(render(value))
    };
    match outcome {
        Ok(true) => Vec::new(),
        Ok(false) => vec![rejected()],
        Err(cause) => vec![rejected().with_cause(cause)],
    }
}

pub(crate) fn depth_exceeded(path: &JsonPath, max_depth: usize) -> SchemaError {
    SchemaError::new(
        path.clone(),
        format!("maximum schema depth of {} exceeded", max_depth),
    )
    .with_kind(ErrorKind::Limit)
}

/// Checks `min`/`max`/`length` against a count (characters, items or keys).
pub(super) fn count_bounds(
    c: &Constraints,
    count: usize,
    noun: &str,
    path: &JsonPath,
) -> Option<SchemaError> {
    let n = count as f64;
    let limit = |message: String, expected: String| {
        SchemaError::new(path.clone(), message)
            .with_kind(ErrorKind::Limit)
            .with_expected(expected)
            .with_got(count.to_string())
    };
    if let Some(length) = c.length {
        if count != length {
            return Some(limit(
                format!("{} must be exactly {}, got {}", noun, length, count),
                length.to_string(),
            ));
        }
    }
    if let Some(min) = c.min {
        if n < min {
            return Some(limit(
                format!("{} {} is below minimum {}", noun, count, render_number(min)),
                render_number(min),
            ));
        }
    }
    if let Some(max) = c.max {
        if n > max {
            return Some(limit(
                format!("{} {} exceeds maximum {}", noun, count, render_number(max)),
                render_number(max),
            ));
        }
    }
    None
}

pub(crate) fn finish(errors: Vec<SchemaError>) -> ValidationResult<()> {
    if errors.is_empty() {
        Validation::Success(())
    } else {
        Validation::Failure(SchemaErrors::from_vec(errors))
    }
}

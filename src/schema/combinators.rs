//! `eval`, `anyOf`, `oneOf` and `not`.
//!
//! In validation the combinators contribute errors like any other check. In a
//! transform they run last, against the already-transformed value: `anyOf`
//! takes the first candidate whose transform succeeds, `oneOf` requires
//! exactly one, and `not` requires its schema's transform to fail.
//! Candidate failures are swallowed and only logged.

use serde_json::Value;

use crate::context::{Frame, TransformContext, ValidationContext};
use crate::error::{SchemaError, TransformError};
use crate::path::JsonPath;

use super::transform::fail;
use super::{render, SchemaNode};

impl SchemaNode {
    pub(super) fn check_combinators(
        &self,
        value: &Value,
        path: &JsonPath,
        cx: &ValidationContext<'_>,
        frame: &Frame<'_>,
    ) -> Vec<SchemaError> {
        let c = &self.constraints;
        let mut errors = Vec::new();

        if !c.any_of.is_empty()
            && !c.any_of.iter().any(|node| node.passes(value, path, cx, Some(frame)))
        {
            errors.push(
                SchemaError::new(
                    path.clone(),
                    format!("value did not match any of {} .anyOf schemas", c.any_of.len()),
                )
                .with_got(render(value)),
            );
        }

        if !c.one_of.is_empty() {
            let matched = c
                .one_of
                .iter()
                .filter(|node| node.passes(value, path, cx, Some(frame)))
                .count();
            if matched != 1 {
                let message = if matched == 0 {
                    format!("value did not match any of {} .oneOf schemas", c.one_of.len())
                } else {
                    format!("value matched {} .oneOf schemas, expected exactly one", matched)
                };
                errors.push(SchemaError::new(path.clone(), message).with_got(render(value)));
            }
        }

        if let Some(not) = &c.not {
            if not.passes(value, path, cx, Some(frame)) {
                errors.push(
                    SchemaError::new(path.clone(), "value must not match the .not schema")
                        .with_got(render(value)),
                );
            }
        }

        errors
    }

    /// Runs the post-merge `eval` and combinator steps of a transform.
    pub(super) fn finish_transform(
        &self,
        target: Option<&Value>,
        result: Value,
        path: &JsonPath,
        cx: &TransformContext<'_>,
        frame: &Frame<'_>,
    ) -> Result<Value, TransformError> {
        let c = &self.constraints;

        if let Some(eval) = &c.eval {
            if eval.deferred {
                return Err(fail(
                    path,
                    format!("asynchronous .eval '{}' cannot run during a transform", eval.name),
                ));
            }
            match (eval.predicate)(&result) {
                Ok(true) => {}
                Ok(false) => return Err(fail(path, format!("value rejected by .eval '{}'", eval.name))),
                Err(cause) => {
                    return Err(fail(
                        path,
                        format!("value rejected by .eval '{}': {}", eval.name, cause),
                    ))
                }
            }
        }

        let mut result = result;

        if !c.any_of.is_empty() {
            let mut chosen = None;
            for (i, node) in c.any_of.iter().enumerate() {
                match node.apply(target, &result, path, cx, Some(frame)) {
                    Ok(out) => {
                        chosen = Some(out);
                        break;
                    }
                    Err(e) => tracing::debug!(path = %path, candidate = i, error = %e, ".anyOf candidate failed"),
                }
            }
            result = chosen.ok_or_else(|| fail(path, "failed .anyOf transforms"))?;
        }

        if !c.one_of.is_empty() {
            let mut successes = Vec::new();
            for (i, node) in c.one_of.iter().enumerate() {
                match node.apply(target, &result, path, cx, Some(frame)) {
                    Ok(out) => successes.push(out),
                    Err(e) => tracing::debug!(path = %path, candidate = i, error = %e, ".oneOf candidate failed"),
                }
            }
            if successes.len() > 1 {
                return Err(fail(path, "too many matching schemata for .oneOf"));
            }
            result = successes
                .pop()
                .ok_or_else(|| fail(path, "failed .oneOf transforms"))?;
        }

        if let Some(not) = &c.not {
            if not.apply(target, &result, path, cx, Some(frame)).is_ok() {
                return Err(fail(path, "value must not match the .not schema"));
            }
        }

        Ok(result)
    }
}

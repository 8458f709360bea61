//! Number validation and arithmetic.

use serde_json::{Number, Value};

use crate::error::{ErrorKind, SchemaError, TransformError};
use crate::path::JsonPath;

use super::constraints::{Arithmetic, TypeTag};
use super::transform::{fail, reject};
use super::{number_value, render_number, SchemaNode};

/// Tolerance for `modulo` on fractional values.
const MODULO_EPSILON: f64 = 1e-9;

impl SchemaNode {
    pub(super) fn validate_number(&self, n: f64, path: &JsonPath) -> Vec<SchemaError> {
        let c = &self.constraints;
        let mut errors = Vec::new();
        let limit = |message: String, expected: f64| {
            SchemaError::new(path.clone(), message)
                .with_kind(ErrorKind::Limit)
                .with_expected(render_number(expected))
                .with_got(render_number(n))
        };

        if let Some(min) = c.min {
            if n < min {
                errors.push(limit(
                    format!("{} is below minimum {}", render_number(n), render_number(min)),
                    min,
                ));
            }
        }
        if let Some(max) = c.max {
            if n > max {
                errors.push(limit(
                    format!("{} exceeds maximum {}", render_number(n), render_number(max)),
                    max,
                ));
            }
        }
        if let Some(min) = c.exclusive_min {
            if n <= min {
                errors.push(limit(
                    format!("{} must be greater than {}", render_number(n), render_number(min)),
                    min,
                ));
            }
        }
        if let Some(max) = c.exclusive_max {
            if n >= max {
                errors.push(limit(
                    format!("{} must be less than {}", render_number(n), render_number(max)),
                    max,
                ));
            }
        }
        if let Some((divisor, remainder)) = c.modulo {
            if ((n % divisor) - remainder).abs() > MODULO_EPSILON {
                errors.push(
                    SchemaError::new(
                        path.clone(),
                        format!(
                            "{} modulo {} is not {}",
                            render_number(n),
                            render_number(divisor),
                            render_number(remainder)
                        ),
                    )
                    .with_got(render_number(n)),
                );
            }
        }
        errors
    }

    pub(super) fn transform_number(
        &self,
        target: Option<f64>,
        value: &Number,
        tag: TypeTag,
        path: &JsonPath,
    ) -> Result<Value, TransformError> {
        let c = &self.constraints;
        let mut n = value
            .as_f64()
            .ok_or_else(|| fail(path, "number is not representable"))?;
        let original = n;

        if let Some(divisor) = c.normal {
            if divisor == 0.0 {
                return Err(fail(path, "cannot normalize by zero"));
            }
            n /= divisor;
        }
        if let Some(divisor) = c.mod_filter {
            if divisor == 0.0 {
                return Err(fail(path, "cannot take modulo zero"));
            }
            n %= divisor;
        }
        if c.inverse {
            n = -n;
        }
        if c.reciprocal {
            if n == 0.0 {
                return Err(fail(path, "cannot take the reciprocal of zero"));
            }
            n = 1.0 / n;
        }

        if let Some(op) = c.arithmetic {
            n = match (op, target) {
                (Arithmetic::Add, t) => t.unwrap_or(0.0) + n,
                (Arithmetic::Subtract, t) => t.unwrap_or(0.0) - n,
                (_, None) => n,
                (Arithmetic::Multiply, Some(t)) => t * n,
                (Arithmetic::Divide, Some(t)) => {
                    if n == 0.0 {
                        return Err(fail(path, "cannot divide by zero"));
                    }
                    t / n
                }
                (Arithmetic::Mean, Some(t)) => (t + n) / 2.0,
                (Arithmetic::Weighted(weight), Some(t)) => t + (n - t) * weight,
            };
        }

        // A fractional result falls through to a declared `number` candidate.
        let fallback = c
            .types
            .as_ref()
            .is_some_and(|types| types.contains(&TypeTag::Number));
        if tag == TypeTag::Integer && n.fract() != 0.0 && !fallback {
            return Err(fail(
                path,
                format!("expected integer, got {}", render_number(n)),
            ));
        }
        reject(self.validate_number(n, path))?;

        if n == original && c.arithmetic.is_none() {
            return Ok(Value::Number(value.clone()));
        }
        number_value(n).ok_or_else(|| fail(path, "result is not a finite number"))
    }
}

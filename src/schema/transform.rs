//! Node-level transform pipeline.
//!
//! A transform runs the value-shaping steps of a node in a fixed order
//! (`transform` function, `cast`, `split`, date extraction, `total`/`mean`,
//! `asElem`), reconciles the value's type against the declared types and the
//! target, hands off to the per-type merge, and finishes with the
//! combinators. Every step produces new values; the caller's target and
//! value are only ever read.

use std::borrow::Cow;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::context::{Frame, TransformContext, DEFAULT_MAX_DEPTH};
use crate::error::{SchemaError, TransformError};
use crate::path::JsonPath;

use super::constraints::{DateField, TypeTag};
use super::{number_value, render, SchemaNode};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

impl SchemaNode {
    /// Merges `value` into `target`, returning a new value that satisfies
    /// this node. Neither argument is modified.
    ///
    /// Accumulating children resolve their paths against `value`; use
    /// [`transform_with_root`](Self::transform_with_root) to supply a
    /// different root document.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemata::Schema;
    /// use serde_json::json;
    ///
    /// let schema = Schema::compile(&json!({".type": "number", ".add": true, ".max": 10})).unwrap();
    ///
    /// assert_eq!(schema.transform(Some(&json!(4)), &json!(3)).unwrap(), json!(7));
    /// assert!(schema.transform(Some(&json!(8)), &json!(3)).is_err());
    /// ```
    pub fn transform(&self, target: Option<&Value>, value: &Value) -> Result<Value, TransformError> {
        self.transform_with_root(target, value, value)
    }

    /// Like [`transform`](Self::transform), resolving accumulation paths against `root`.
    pub fn transform_with_root(
        &self,
        target: Option<&Value>,
        value: &Value,
        root: &Value,
    ) -> Result<Value, TransformError> {
        let cx = TransformContext::new(root, DEFAULT_MAX_DEPTH);
        self.apply(target, value, &JsonPath::root(), &cx, None)
    }

    pub(crate) fn apply(
        &self,
        target: Option<&Value>,
        value: &Value,
        path: &JsonPath,
        cx: &TransformContext<'_>,
        parent: Option<&Frame<'_>>,
    ) -> Result<Value, TransformError> {
        let frame = Frame::enter(self, parent);
        self.apply_in(target, value, path, cx, &frame)
            .map_err(|e| e.override_message(self.constraints.error.as_deref()))
    }

    fn apply_in(
        &self,
        target: Option<&Value>,
        value: &Value,
        path: &JsonPath,
        cx: &TransformContext<'_>,
        frame: &Frame<'_>,
    ) -> Result<Value, TransformError> {
        let c = &self.constraints;

        if frame.depth() > cx.max_depth {
            return Err(fail(
                path,
                format!("maximum schema depth of {} exceeded", cx.max_depth),
            ));
        }
        if c.invalid {
            return Err(fail(path, "value is not allowed here"));
        }
        if c.is_null_only() {
            return match value {
                Value::Null => Ok(Value::Null),
                other => Err(fail(path, format!("expected null, got {}", TypeTag::of(other)))),
            };
        }
        if let Some(levels) = c.recurse {
            return match frame.ancestor(levels) {
                Some(node) => node.apply(target, value, path, cx, Some(frame)),
                None => Err(fail(
                    path,
                    format!(".recurse distance {} reaches past the root schema", levels),
                )),
            };
        }

        let mut value = Cow::Borrowed(value);

        if let Some((name, function)) = &c.transform {
            let replaced = function(target, &value).map_err(|cause| {
                tracing::debug!(function = %name, path = %path, %cause, "transform function failed");
                fail(path, "transform function failed")
            })?;
            value = Cow::Owned(replaced);
        }
        if c.cast {
            value = Cow::Owned(self.cast(&value, path)?);
        }
        if let (Some(separator), Value::String(s)) = (&c.split, value.as_ref()) {
            let parts = s.split(separator.as_str()).map(|p| Value::String(p.to_string())).collect();
            value = Cow::Owned(Value::Array(parts));
        }
        if let Some(field) = c.date_field {
            let extracted = parse_date(&value)
                .map(|date| extract_date(field, &date))
                .ok_or_else(|| fail(path, format!("{} is not a date", render(&value))))?;
            value = Cow::Owned(extracted);
        }
        if c.total || c.mean {
            if let Value::Array(items) = value.as_ref() {
                value = Cow::Owned(reduce(items, c.mean, path)?);
            }
        }
        if c.as_elem {
            value = Cow::Owned(Value::Array(vec![value.into_owned()]));
        }

        let Some(tag) = c.resolve_type(&value) else {
            return Err(fail(
                path,
                format!("expected {}, got {}", c.type_names(), TypeTag::of(&value)),
            ));
        };

        let mut target = target.filter(|t| !t.is_null());
        if let Some(t) = target {
            if TypeTag::of(t) != TypeTag::of(&value) {
                if c.cast || c.split.is_some() || c.group.is_some() {
                    target = None;
                } else {
                    return Err(fail(
                        path,
                        format!("cannot merge {} into {}", TypeTag::of(&value), TypeTag::of(t)),
                    ));
                }
            }
        }

        let result = match (tag, value.as_ref()) {
            (TypeTag::Object, Value::Object(map)) => {
                self.transform_object(target.and_then(Value::as_object), map, path, cx, frame)?
            }
            (TypeTag::Array, Value::Array(items)) => {
                self.transform_array(target.and_then(Value::as_array), items, path, cx, frame)?
            }
            (TypeTag::String, v) => self.transform_string(target.and_then(Value::as_str), v, path)?,
            (TypeTag::Number | TypeTag::Integer, Value::Number(n)) => {
                self.transform_number(target.and_then(Value::as_f64), n, tag, path)?
            }
            (TypeTag::Boolean, Value::Bool(b)) => self.transform_boolean(*b),
            (TypeTag::Null, _) => Value::Null,
            (tag, other) => {
                return Err(fail(
                    path,
                    format!("cannot transform {} as {}", TypeTag::of(other), tag),
                ))
            }
        };

        self.finish_transform(target, result, path, cx, frame)
    }

    /// Parses a string into one of the declared types, or stringifies a
    /// non-string when `string` is declared.
    fn cast(&self, value: &Value, path: &JsonPath) -> Result<Value, TransformError> {
        let c = &self.constraints;
        if c.admits(value) {
            return Ok(value.clone());
        }
        let wants_string = c
            .types
            .as_ref()
            .is_some_and(|types| types.contains(&TypeTag::String));
        let cast = match value {
            Value::String(s) => serde_json::from_str::<Value>(s).ok(),
            other if wants_string => Some(Value::String(render(other))),
            _ => None,
        };
        cast.filter(|v| c.admits(v)).ok_or_else(|| {
            fail(
                path,
                format!("failed to cast {} to {}", render(value), c.type_names()),
            )
        })
    }
}

pub(crate) fn fail(path: &JsonPath, message: impl Into<String>) -> TransformError {
    TransformError::new(path.clone(), message)
}

/// Converts the first validation failure of a post-transform check.
pub(super) fn reject(errors: Vec<SchemaError>) -> Result<(), TransformError> {
    match errors.into_iter().next() {
        Some(error) => Err(TransformError::new(error.path, error.message)),
        None => Ok(()),
    }
}

/// Resolves an insertion offset; negative offsets count from the end.
pub(super) fn position(offset: i64, len: usize) -> usize {
    if offset < 0 {
        len.saturating_sub(offset.unsigned_abs() as usize)
    } else {
        (offset as usize).min(len)
    }
}

/// Merges objects key by key; any other value replaces the prior one.
pub(crate) fn default_merge(prior: Option<&Value>, value: &Value) -> Value {
    match (prior, value) {
        (Some(Value::Object(base)), Value::Object(incoming)) => {
            let mut merged = base.clone();
            for (key, item) in incoming {
                let next = default_merge(merged.get(key), item);
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        _ => value.clone(),
    }
}

fn reduce(items: &[Value], mean: bool, path: &JsonPath) -> Result<Value, TransformError> {
    let mut sum = 0.0;
    for item in items {
        sum += item
            .as_f64()
            .ok_or_else(|| fail(path, format!("cannot total non-numeric item {}", render(item))))?;
    }
    if mean {
        if items.is_empty() {
            return Err(fail(path, "cannot take the mean of an empty array"));
        }
        sum /= items.len() as f64;
    }
    number_value(sum).ok_or_else(|| fail(path, "total is not a finite number"))
}

fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.naive_local())
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            }),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|d| d.naive_utc()),
        _ => None,
    }
}

fn extract_date(field: DateField, date: &NaiveDateTime) -> Value {
    let weekday = date.weekday().num_days_from_sunday();
    match field {
        DateField::Year => Value::from(date.year()),
        DateField::YearName => Value::String(date.year().to_string()),
        DateField::Month => Value::from(date.month()),
        DateField::MonthName => Value::String(MONTH_NAMES[date.month0() as usize].to_string()),
        DateField::Day => Value::from(date.day()),
        DateField::DayNum => Value::from(weekday),
        DateField::DayName => Value::String(DAY_NAMES[weekday as usize].to_string()),
    }
}

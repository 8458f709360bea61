//! String validation and merging. Lengths and offsets count characters.

use serde_json::Value;

use crate::error::{ErrorKind, SchemaError, TransformError};
use crate::path::JsonPath;

use super::constraints::{Case, InjectAt};
use super::transform::{position, reject};
use super::validate::count_bounds;
use super::{render, SchemaNode};

impl SchemaNode {
    pub(super) fn validate_string(&self, s: &str, path: &JsonPath) -> Vec<SchemaError> {
        let c = &self.constraints;
        let mut errors: Vec<SchemaError> = count_bounds(c, s.chars().count(), "length", path)
            .into_iter()
            .collect();

        if let Some(pattern) = &c.pattern {
            if !pattern.is_match(s) {
                errors.push(
                    SchemaError::new(path.clone(), "value does not match pattern")
                        .with_kind(ErrorKind::Format)
                        .with_expected(pattern.as_str())
                        .with_got(render(&Value::String(s.to_string()))),
                );
            }
        }
        if let Some(format) = c.format {
            if let Err(e) = format.check(s) {
                errors.push(
                    SchemaError::new(path.clone(), e.to_string())
                        .with_kind(ErrorKind::Format)
                        .with_expected(format.name()),
                );
            }
        }
        errors
    }

    pub(super) fn transform_string(
        &self,
        target: Option<&str>,
        value: &Value,
        path: &JsonPath,
    ) -> Result<Value, TransformError> {
        let c = &self.constraints;
        let mut s = match value {
            Value::String(s) => s.clone(),
            other => render(other),
        };

        match c.case {
            Some(Case::Upper) => s = s.to_uppercase(),
            Some(Case::Lower) => s = s.to_lowercase(),
            None => {}
        }

        for (at, item) in &c.inject {
            let text = match item {
                Value::String(t) => t.clone(),
                other => render(other),
            };
            match at {
                InjectAt::Index(offset) => s = splice(&s, *offset, &text),
                InjectAt::End => s.push_str(&text),
                InjectAt::Key(_) => {}
            }
        }

        if let Some((start, end)) = c.partial {
            s = slice(&s, start, end);
        }

        let base = target.unwrap_or("");
        let mut merged = if let Some(offset) = c.insert {
            splice(base, offset, &s)
        } else if c.append {
            format!("{}{}", base, s)
        } else if c.prepend {
            format!("{}{}", s, base)
        } else {
            s
        };

        if let Some(n) = c.clip {
            merged = clip(&merged, n);
        }

        reject(self.validate_string(&merged, path))?;
        Ok(Value::String(merged))
    }
}

fn splice(s: &str, offset: i64, text: &str) -> String {
    let at = position(offset, s.chars().count());
    let mut out: String = s.chars().take(at).collect();
    out.push_str(text);
    out.extend(s.chars().skip(at));
    out
}

/// Character slice with negative offsets counting from the end.
fn slice(s: &str, start: i64, end: Option<i64>) -> String {
    let len = s.chars().count();
    let from = position(start, len);
    let to = end.map_or(len, |e| position(e, len));
    if to <= from {
        return String::new();
    }
    s.chars().skip(from).take(to - from).collect()
}

/// Keeps the first `n` characters, or the last `-n`.
fn clip(s: &str, n: i64) -> String {
    let keep = n.unsigned_abs() as usize;
    let len = s.chars().count();
    if keep >= len {
        s.to_string()
    } else if n > 0 {
        s.chars().take(keep).collect()
    } else {
        s.chars().skip(len - keep).collect()
    }
}

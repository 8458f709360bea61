//! Array validation and merging.

use std::cmp::Ordering;

use serde_json::Value;

use crate::context::{Frame, TransformContext, ValidationContext};
use crate::error::{ErrorKind, SchemaError, TransformError};
use crate::path::JsonPath;
use crate::unique::UniquenessSet;

use super::constraints::{InjectAt, SortOrder};
use super::transform::{fail, position};
use super::validate::count_bounds;
use super::{render, render_number, SchemaNode};

impl SchemaNode {
    pub(super) fn validate_array(
        &self,
        items: &[Value],
        path: &JsonPath,
        cx: &ValidationContext<'_>,
        frame: &Frame<'_>,
    ) -> Vec<SchemaError> {
        let c = &self.constraints;
        let mut errors: Vec<SchemaError> = count_bounds(c, items.len(), "length", path).into_iter().collect();

        if c.unique {
            let mut seen = UniquenessSet::new();
            for (i, item) in items.iter().enumerate() {
                if !seen.add(item) {
                    errors.push(
                        SchemaError::new(path.push_index(i), "duplicate array item")
                            .with_kind(ErrorKind::Illegal)
                            .with_got(render(item)),
                    );
                }
            }
        }

        if let Some(sequence) = &c.sequence {
            for (i, item) in items.iter().enumerate() {
                let item_path = path.push_index(i);
                match sequence.get(i).or(c.extras.as_deref()) {
                    Some(node) => errors.extend(node.check(Some(item), &item_path, cx, Some(frame))),
                    None => errors.push(
                        SchemaError::new(item_path, "unexpected array item")
                            .with_kind(ErrorKind::Illegal)
                            .with_got(render(item)),
                    ),
                }
            }
            for (i, node) in sequence.iter().enumerate().skip(items.len()) {
                errors.extend(node.check(None, &path.push_index(i), cx, Some(frame)));
            }
        } else if let Some(all) = &c.all {
            for (i, item) in items.iter().enumerate() {
                errors.extend(all.check(Some(item), &path.push_index(i), cx, Some(frame)));
            }
        }

        for rule in &c.exists {
            let found = items
                .iter()
                .enumerate()
                .filter(|(i, item)| rule.schema.passes(item, &path.push_index(*i), cx, Some(frame)))
                .count();
            if found < rule.count {
                errors.push(
                    SchemaError::new(
                        path.clone(),
                        format!(
                            "expected at least {} item(s) matching .exists, found {}",
                            rule.count, found
                        ),
                    )
                    .with_kind(ErrorKind::Missing),
                );
            }
        }

        errors
    }

    pub(super) fn transform_array(
        &self,
        target: Option<&Vec<Value>>,
        value: &[Value],
        path: &JsonPath,
        cx: &TransformContext<'_>,
        frame: &Frame<'_>,
    ) -> Result<Value, TransformError> {
        let c = &self.constraints;
        let merging = c.merges();
        let positional = c.all.is_some() || c.sequence.is_some();

        let mut incoming = value.to_vec();
        for (at, item) in &c.inject {
            match at {
                InjectAt::Index(offset) => {
                    let at = position(*offset, incoming.len());
                    incoming.insert(at, item.clone());
                }
                InjectAt::End => incoming.push(item.clone()),
                InjectAt::Key(_) => {}
            }
        }

        let mut base = target.cloned().unwrap_or_default();
        if c.unique {
            let mut seen = UniquenessSet::new();
            base.retain(|item| seen.add(item));
            incoming.retain(|item| seen.add(item));
        }

        if let (Some(order), Some(_)) = (c.sort, &c.sequence) {
            sort_values(&mut incoming, order);
            sort_values(&mut base, order);
        }

        if merging && c.clip.is_none() {
            if let Some(max) = c.max {
                let grown = base.len() + incoming.len();
                if grown as f64 > max {
                    return Err(fail(
                        path,
                        format!(
                            "array of length {} would exceed maximum {}",
                            grown,
                            render_number(max)
                        ),
                    ));
                }
            }
        }

        if positional || c.filter.is_some() {
            let checker = cx.checker();
            let mut produced = Vec::with_capacity(incoming.len());
            for (i, item) in incoming.iter().enumerate() {
                let item_path = path.push_index(i);
                if let Some(filter) = &c.filter {
                    if !filter.passes(item, &item_path, &checker, Some(frame)) {
                        continue;
                    }
                }
                let index = produced.len();
                let node = match &c.sequence {
                    Some(sequence) => sequence.get(index).or(c.extras.as_deref()),
                    None => c.all.as_deref(),
                };
                let out = match node {
                    Some(node) => {
                        let prior = if merging { None } else { base.get(index) };
                        node.apply(prior, item, &path.push_index(index), cx, Some(frame))?
                    }
                    None if positional => return Err(fail(&item_path, "found unexpected array item")),
                    None => item.clone(),
                };
                produced.push(out);
            }
            incoming = produced;
        }

        let mut merged = if let Some(offset) = c.insert {
            let at = position(offset, base.len());
            base.splice(at..at, incoming);
            base
        } else if c.append {
            base.extend(incoming);
            base
        } else if c.prepend {
            incoming.extend(base);
            incoming
        } else if positional {
            let overwritten = incoming.len();
            if base.len() > overwritten {
                incoming.extend(base.drain(overwritten..));
            }
            incoming
        } else {
            incoming
        };

        if let Some(order) = c.sort {
            if c.sequence.is_none() {
                sort_values(&mut merged, order);
            }
        }

        if let Some(n) = c.clip {
            let keep = n.unsigned_abs() as usize;
            if merged.len() > keep {
                if n > 0 {
                    let excess = merged.len() - keep;
                    merged.drain(..excess);
                } else {
                    merged.truncate(keep);
                }
            }
        }

        if let Some(error) = count_bounds(c, merged.len(), "length", path) {
            return Err(fail(path, error.message));
        }
        if c.unique {
            let mut seen = UniquenessSet::new();
            if let Some(i) = merged.iter().position(|item| !seen.add(item)) {
                return Err(fail(&path.push_index(i), "duplicate array item"));
            }
        }
        if !c.exists.is_empty() {
            let checker = cx.checker();
            for rule in &c.exists {
                let found = merged
                    .iter()
                    .enumerate()
                    .filter(|(i, item)| rule.schema.passes(item, &path.push_index(*i), &checker, Some(frame)))
                    .count();
                if found < rule.count {
                    return Err(fail(
                        path,
                        format!(
                            "expected at least {} item(s) matching .exists, found {}",
                            rule.count, found
                        ),
                    ));
                }
            }
        }

        Ok(Value::Array(merged))
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| render(a).cmp(&render(b))),
    }
}

fn sort_values(values: &mut [Value], order: SortOrder) {
    match order {
        SortOrder::Ascending => values.sort_by(compare),
        SortOrder::Descending => values.sort_by(|a, b| compare(b, a)),
    }
}

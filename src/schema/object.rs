//! Object validation and merging.
//!
//! Keys resolve against, in order: a declared child, the first matching
//! `matchChildren` pattern, `extras`, `adHoc`, then `keyTest`. A key none of
//! these accept is illegal in validation; in a transform it may still be
//! dropped (`tolerant`) or merged over a key the target already has.

use serde_json::{Map, Value};

use crate::context::{Frame, TransformContext, ValidationContext};
use crate::error::{ErrorKind, SchemaError, TransformError};
use crate::path::JsonPath;
use crate::unique::UniquenessSet;

use super::constraints::{InjectAt, TypeTag};
use super::transform::{default_merge, fail};
use super::validate::count_bounds;
use super::{render, SchemaNode};

impl SchemaNode {
    pub(super) fn validate_object(
        &self,
        value: &Value,
        map: &Map<String, Value>,
        path: &JsonPath,
        cx: &ValidationContext<'_>,
        frame: &Frame<'_>,
    ) -> Vec<SchemaError> {
        let c = &self.constraints;
        let mut errors = Vec::new();
        let mut found = vec![0usize; c.exists.len()];
        let mut seen = c.unique.then(UniquenessSet::new);

        for (key, item) in map {
            let key_path = path.push_field(key);

            if let Some(child) = self.child_for(key) {
                errors.extend(child.check(Some(item), &key_path, cx, Some(frame)));
            } else if let Some(extras) = &c.extras {
                errors.extend(extras.check(Some(item), &key_path, cx, Some(frame)));
            } else if c.ad_hoc {
            } else if let Some(test) = &c.key_test {
                if !test.passes(&Value::String(key.clone()), &key_path, cx, Some(frame)) {
                    errors.push(
                        SchemaError::new(key_path.clone(), format!("key '{}' rejected by .keyTest", key))
                            .with_kind(ErrorKind::Illegal),
                    );
                }
            } else {
                errors.push(
                    SchemaError::new(key_path.clone(), format!("unexpected key '{}'", key))
                        .with_kind(ErrorKind::Illegal),
                );
            }

            if let Some(all) = &c.all {
                errors.extend(all.check(Some(item), &key_path, cx, Some(frame)));
            }
            for (rule, count) in c.exists.iter().zip(found.iter_mut()) {
                if rule.schema.passes(item, &key_path, cx, Some(frame)) {
                    *count += 1;
                }
            }
            if let Some(seen) = seen.as_mut() {
                if !seen.add(item) {
                    errors.push(
                        SchemaError::new(key_path, "duplicate property value")
                            .with_kind(ErrorKind::Illegal)
                            .with_got(render(item)),
                    );
                }
            }
        }

        for (rule, count) in c.exists.iter().zip(found) {
            if count < rule.count {
                errors.push(unmet_exists(path, rule.count, count));
            }
        }

        for (name, child) in &self.children {
            if !map.contains_key(name) {
                errors.extend(child.check(None, &path.push_field(name), cx, Some(frame)));
            }
        }

        for (key, dependency) in &c.dependencies {
            if map.contains_key(key) {
                errors.extend(dependency.check(Some(value), path, cx, Some(frame)));
            }
        }

        errors.extend(count_bounds(c, map.len(), "key count", path));
        errors
    }

    pub(super) fn transform_object(
        &self,
        target: Option<&Map<String, Value>>,
        value: &Map<String, Value>,
        path: &JsonPath,
        cx: &TransformContext<'_>,
        frame: &Frame<'_>,
    ) -> Result<Value, TransformError> {
        let c = &self.constraints;
        let checker = cx.checker();

        let injected;
        let value = if c.inject.is_empty() {
            value
        } else {
            let mut copy = value.clone();
            for (at, item) in &c.inject {
                if let InjectAt::Key(key) = at {
                    copy.insert(key.clone(), item.clone());
                }
            }
            injected = copy;
            &injected
        };

        // Plain keys keep input order; renamed keys follow in declaration order.
        let mut entries: Vec<(&str, &Value)> = value
            .iter()
            .filter(|(key, _)| !c.rename.contains_key(*key))
            .map(|(key, item)| (key.as_str(), item))
            .collect();
        for (from, to) in &c.rename {
            if let Some(item) = value.get(from) {
                entries.push((to.as_str(), item));
            }
        }
        entries.retain(|(key, _)| !c.drop.iter().any(|d| d == key));

        let mut result = target.cloned().unwrap_or_default();
        let mut seen = c.unique.then(|| {
            UniquenessSet::from_values(
                result
                    .iter()
                    .filter(|(key, _)| !entries.iter().any(|(e, _)| *e == key.as_str()))
                    .map(|(_, item)| item),
            )
        });

        for &(key, item) in &entries {
            let key_path = path.push_field(key);

            if let Some(filter) = &c.filter {
                if !filter.passes(item, &key_path, &checker, Some(frame)) {
                    tracing::trace!(path = %key_path, "key dropped by .filter");
                    continue;
                }
            }

            let prior = result.get(key);
            let produced = match self.child_for(key) {
                Some(child) if child.accumulates() => {
                    child.gather(prior, Some(item), &key_path, cx, Some(frame))?
                }
                Some(child) => Some(child.apply(prior, item, &key_path, cx, Some(frame))?),
                None => self.unknown_key(key, prior, item, &key_path, cx, frame)?,
            };
            let Some(produced) = produced else {
                continue;
            };

            if let Some(all) = &c.all {
                if !all.passes(&produced, &key_path, &checker, Some(frame)) {
                    return Err(fail(&key_path, "value does not satisfy .all"));
                }
            }
            if let Some(seen) = seen.as_mut() {
                if !seen.add(&produced) {
                    return Err(fail(&key_path, "duplicate property"));
                }
            }
            result.insert(key.to_string(), produced);
        }

        for (name, child) in &self.children {
            if entries.iter().any(|(key, _)| key == name) {
                continue;
            }
            let child_path = path.push_field(name);
            if child.accumulates() {
                if let Some(gathered) = child.gather(result.get(name), None, &child_path, cx, Some(frame))? {
                    result.insert(name.clone(), gathered);
                }
                continue;
            }
            if result.contains_key(name) {
                continue;
            }
            if let Some(default) = &child.constraints.default {
                result.insert(name.clone(), default.clone());
            } else if child.types() == Some(&[TypeTag::Object][..]) {
                match child.apply(None, &Value::Object(Map::new()), &child_path, cx, Some(frame)) {
                    Ok(Value::Object(built)) if child.is_optional() && built.is_empty() => {}
                    Ok(built) => {
                        result.insert(name.clone(), built);
                    }
                    Err(_) if child.is_optional() => {}
                    Err(e) => return Err(e),
                }
            } else if !child.is_optional() {
                return Err(fail(
                    &child_path,
                    format!("final Object is incomplete: missing '{}'", name),
                ));
            }
        }

        if let Some(n) = c.clip {
            result = clip_keys(result, n);
            let clipped = self
                .children
                .iter()
                .find(|(name, child)| !child.is_optional() && !result.contains_key(name.as_str()));
            if let Some((name, _)) = clipped {
                return Err(fail(
                    &path.push_field(name),
                    format!("final Object is incomplete: missing '{}'", name),
                ));
            }
        }

        if let Some(error) = count_bounds(c, result.len(), "key count", path) {
            return Err(fail(path, error.message));
        }
        for rule in &c.exists {
            let count = result
                .iter()
                .filter(|(key, item)| rule.schema.passes(item, &path.push_field(*key), &checker, Some(frame)))
                .count();
            if count < rule.count {
                return Err(fail(path, unmet_exists(path, rule.count, count).message));
            }
        }

        let result = Value::Object(result);
        for (key, dependency) in &c.dependencies {
            if result.get(key).is_some() && !dependency.passes(&result, path, &checker, Some(frame)) {
                return Err(fail(path, format!("dependency of '{}' is not satisfied", key)));
            }
        }
        Ok(result)
    }

    /// Resolves a key with no declared or pattern child. `None` drops it.
    fn unknown_key(
        &self,
        key: &str,
        prior: Option<&Value>,
        item: &Value,
        path: &JsonPath,
        cx: &TransformContext<'_>,
        frame: &Frame<'_>,
    ) -> Result<Option<Value>, TransformError> {
        let c = &self.constraints;
        if let Some(extras) = &c.extras {
            return extras.apply(prior, item, path, cx, Some(frame)).map(Some);
        }
        if c.ad_hoc {
            return Ok(Some(default_merge(prior, item)));
        }
        if let Some(test) = &c.key_test {
            let name = Value::String(key.to_string());
            if test.passes(&name, path, &cx.checker(), Some(frame)) {
                return Ok(Some(default_merge(prior, item)));
            }
            return Err(fail(path, format!("key '{}' rejected by .keyTest", key)));
        }
        if c.tolerant {
            tracing::trace!(path = %path, "unknown key dropped by .tolerant");
            return Ok(None);
        }
        if prior.is_some() {
            return Ok(Some(default_merge(prior, item)));
        }
        Err(fail(path, format!("found unknown key '{}'", key)))
    }
}

fn unmet_exists(path: &JsonPath, required: usize, found: usize) -> SchemaError {
    SchemaError::new(
        path.clone(),
        format!(
            "expected at least {} member(s) matching .exists, found {}",
            required, found
        ),
    )
    .with_kind(ErrorKind::Missing)
}

/// Keeps the newest `n` keys by insertion order, or the oldest `-n`.
fn clip_keys(map: Map<String, Value>, n: i64) -> Map<String, Value> {
    let keep = n.unsigned_abs() as usize;
    let len = map.len();
    if keep >= len {
        return map;
    }
    if n > 0 {
        map.into_iter().skip(len - keep).collect()
    } else {
        map.into_iter().take(keep).collect()
    }
}

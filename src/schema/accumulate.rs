//! Accumulation: values gathered from source paths folded through a node.

use serde_json::Value;

use crate::context::{Frame, TransformContext, DEFAULT_MAX_DEPTH};
use crate::error::TransformError;
use crate::path::JsonPath;
use crate::unique::deep_equal;

use super::constraints::{Source, SourceMode};
use super::SchemaNode;

impl SchemaNode {
    /// Resolves this node's `fill`/`list` source against `root` and folds the
    /// resolved values through the node's transform.
    ///
    /// Returns `Ok(None)` when nothing was resolved and there is no seed.
    /// A node without a source behaves like [`transform`](Self::transform).
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemata::Schema;
    /// use serde_json::json;
    ///
    /// let total = Schema::compile(&json!({".type": "number", ".add": true, ".fill": "items/qty"})).unwrap();
    /// let root = json!({"items": [{"qty": 2}, {"qty": 5}]});
    ///
    /// assert_eq!(total.accumulate(None, None, &root).unwrap(), Some(json!(7)));
    /// assert_eq!(total.accumulate(Some(&json!(10)), None, &root).unwrap(), Some(json!(17)));
    /// ```
    pub fn accumulate(
        &self,
        target: Option<&Value>,
        value: Option<&Value>,
        root: &Value,
    ) -> Result<Option<Value>, TransformError> {
        let cx = TransformContext::new(root, DEFAULT_MAX_DEPTH);
        self.gather(target, value, &JsonPath::root(), &cx, None)
    }

    pub(crate) fn gather(
        &self,
        target: Option<&Value>,
        value: Option<&Value>,
        path: &JsonPath,
        cx: &TransformContext<'_>,
        parent: Option<&Frame<'_>>,
    ) -> Result<Option<Value>, TransformError> {
        let c = &self.constraints;
        let Some((mode, source)) = &c.source else {
            return match value {
                Some(value) => self.apply(target, value, path, cx, parent).map(Some),
                None => Ok(target.cloned()),
            };
        };
        let frame = Frame::enter(self, parent);

        let resolved: Vec<Value> = match source {
            Source::Paths(paths) => paths.iter().flat_map(|p| p.resolve(cx.root)).collect(),
            Source::Schema(node) => match node.gather(None, None, path, cx, Some(&frame))? {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            },
        };
        tracing::trace!(path = %path, resolved = resolved.len(), "resolved accumulation source");

        if let Some(group) = &c.group {
            return self.group(group, resolved, path, cx, &frame).map(Some);
        }

        match mode {
            SourceMode::List => {
                let mut sequence = Vec::with_capacity(resolved.len() + 1);
                sequence.extend(value.cloned());
                sequence.extend(flatten(resolved));
                if sequence.is_empty() {
                    return Ok(target.cloned());
                }
                self.apply(target, &Value::Array(sequence), path, cx, parent)
                    .map(Some)
            }
            SourceMode::Fill => {
                let mut acc = value.or(target).cloned();
                for item in &resolved {
                    acc = Some(self.apply(acc.as_ref(), item, path, cx, parent)?);
                }
                Ok(acc)
            }
        }
    }

    /// Buckets resolved values by their `group` key, in first-seen order.
    fn group(
        &self,
        group: &SchemaNode,
        resolved: Vec<Value>,
        path: &JsonPath,
        cx: &TransformContext<'_>,
        frame: &Frame<'_>,
    ) -> Result<Value, TransformError> {
        let mut buckets: Vec<(Value, Vec<Value>)> = Vec::new();
        for item in flatten(resolved) {
            let key = group.apply(None, &item, path, cx, Some(frame))?;
            match buckets.iter_mut().find(|(k, _)| deep_equal(k, &key)) {
                Some((_, bucket)) => bucket.push(item),
                None => buckets.push((key, vec![item])),
            }
        }
        tracing::trace!(path = %path, buckets = buckets.len(), "grouped accumulation values");

        let mut out = Vec::with_capacity(buckets.len());
        for (_, bucket) in buckets {
            let bucket = Value::Array(bucket);
            out.push(match &self.constraints.group_transform {
                Some(post) => post.apply(None, &bucket, path, cx, Some(frame))?,
                None => bucket,
            });
        }
        Ok(Value::Array(out))
    }
}

/// Splices resolved arrays into one flat sequence.
fn flatten(resolved: Vec<Value>) -> impl Iterator<Item = Value> {
    resolved.into_iter().flat_map(|v| match v {
        Value::Array(items) => items,
        other => vec![other],
    })
}

#[cfg(test)]
mod tests {
    use crate::schema::Schema;
    use serde_json::json;

    #[test]
    fn test_list_prepends_value() {
        let schema = Schema::compile(&json!({".type": "array", ".list": "a/b"})).unwrap();
        let root = json!({"a": [{"b": 1}, {"b": 2}]});
        assert_eq!(
            schema.accumulate(None, Some(&json!(0)), &root).unwrap(),
            Some(json!([0, 1, 2]))
        );
    }

    #[test]
    fn test_nothing_resolved() {
        let schema = Schema::compile(&json!({".type": "array", ".list": "missing/path"})).unwrap();
        assert_eq!(schema.accumulate(None, None, &json!({})).unwrap(), None);
        assert_eq!(
            schema.accumulate(Some(&json!([9])), None, &json!({})).unwrap(),
            Some(json!([9]))
        );
    }

    #[test]
    fn test_fill_folds_each_value() {
        let schema = Schema::compile(&json!({".type": "number", ".multiply": true, ".fill": ["a", "b/c"]})).unwrap();
        let root = json!({"a": 2, "b": [{"c": 3}, {"c": 4}]});
        assert_eq!(schema.accumulate(None, None, &root).unwrap(), Some(json!(24)));
        assert_eq!(schema.accumulate(None, Some(&json!(10)), &root).unwrap(), Some(json!(240)));
    }

    #[test]
    fn test_multiple_paths() {
        let schema = Schema::compile(&json!({".type": "array", ".list": ["x", "y/z"]})).unwrap();
        let root = json!({"x": "first", "y": [{"z": "second"}, {"z": "third"}]});
        assert_eq!(
            schema.accumulate(None, None, &root).unwrap(),
            Some(json!(["first", "second", "third"]))
        );
    }

    #[test]
    fn test_list_splices_array_leaves() {
        let schema = Schema::compile(&json!({".type": "array", ".list": "posts/tags"})).unwrap();
        let root = json!({"posts": [{"tags": ["a", "b"]}, {"tags": ["c"]}, {"tags": "d"}]});
        assert_eq!(
            schema.accumulate(None, None, &root).unwrap(),
            Some(json!(["a", "b", "c", "d"]))
        );
    }

    #[test]
    fn test_group_by_key() {
        let schema = Schema::compile(&json!({
            ".type": "array",
            ".list": "events",
            ".group": {".getYear": true}
        }))
        .unwrap();
        let root = json!({"events": ["2023-01-05", "2024-02-01", "2023-07-09"]});
        assert_eq!(
            schema.accumulate(None, None, &root).unwrap(),
            Some(json!([["2023-01-05", "2023-07-09"], ["2024-02-01"]]))
        );
    }

    #[test]
    fn test_group_transform() {
        let schema = Schema::compile(&json!({
            ".type": "array",
            ".list": "values",
            ".group": {".modFilter": 2},
            ".groupTransform": {".type": "number", ".total": true}
        }))
        .unwrap();
        let root = json!({"values": [1, 2, 3, 4, 5]});
        assert_eq!(schema.accumulate(None, None, &root).unwrap(), Some(json!([9, 6])));
    }
}

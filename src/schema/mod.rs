//! Schema nodes and their evaluation.
//!
//! A [`SchemaNode`] is compiled once from a declarative definition and is
//! immutable afterwards. It exposes three operations, each dispatching on the
//! classified type of the document value:
//!
//! - `validate`: check a document, accumulating every failure
//! - `transform`: merge a new value into a prior target under the node's
//!   mutation constraints, producing a result that satisfies the node
//! - `accumulate`: gather values from path expressions and fold them through
//!   the node's transform
//!
//! # Example
//!
//! ```rust
//! use schemata::{JsonPath, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::compile(&json!({
//!     "name": {".type": "string", ".min": 1},
//!     "tags": {".type": "array", ".unique": true, ".append": true}
//! })).unwrap();
//!
//! assert!(schema.validate(&json!({"name": "a", "tags": []}), &JsonPath::root()).is_success());
//!
//! let merged = schema
//!     .transform(Some(&json!({"name": "a", "tags": ["x"]})), &json!({"name": "b", "tags": ["x", "y"]}))
//!     .unwrap();
//! assert_eq!(merged, json!({"name": "b", "tags": ["x", "y"]}));
//! ```

mod accumulate;
mod array;
mod boolean;
mod combinators;
mod compile;
mod constraints;
mod numeric;
mod object;
mod string;
mod transform;
mod validate;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use serde_json::Value;

pub use compile::{CompileError, Compiler};
pub use constraints::{Predicate, TransformFn, TypeTag};

pub(crate) use constraints::Constraints;

/// Process-unique identity of a compiled node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// One compiled level of a schema.
///
/// A node exclusively owns its children and every nested node referenced by
/// its constraints; the tree is acyclic, and self-reference is expressed with
/// `recurse` (an ancestor distance resolved during evaluation).
pub struct SchemaNode {
    id: NodeId,
    pub(crate) constraints: Constraints,
    pub(crate) children: IndexMap<String, SchemaNode>,
}

impl SchemaNode {
    pub(crate) fn new(constraints: Constraints, children: IndexMap<String, SchemaNode>) -> Self {
        Self {
            id: NodeId::next(),
            constraints,
            children,
        }
    }

    /// Returns this node's identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the declared child for a literal key.
    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children.get(name)
    }

    /// Returns true if an absent value satisfies this node.
    pub fn is_optional(&self) -> bool {
        self.constraints.optional
    }

    /// Returns the declared types, if any.
    pub fn types(&self) -> Option<&[TypeTag]> {
        self.constraints.types.as_deref()
    }

    /// Returns true if this node derives its value through `fill` or `list`.
    pub fn accumulates(&self) -> bool {
        self.constraints.source.is_some()
    }

    /// The declared child, else the first `matchChildren` pattern matching `key`.
    pub(crate) fn child_for(&self, key: &str) -> Option<&SchemaNode> {
        self.children.get(key).or_else(|| {
            self.constraints
                .match_children
                .iter()
                .find(|(pattern, _)| pattern.is_match(key))
                .map(|(_, node)| node)
        })
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("id", &self.id)
            .field("types", &self.constraints.types)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<SchemaNode>();
    assert_sync::<SchemaNode>();
};

/// Entry point for building schema nodes.
///
/// # Example
///
/// ```rust
/// use schemata::{JsonPath, Schema};
/// use serde_json::json;
///
/// // Shorthand: a string leaf is matched as a regular expression.
/// let schema = Schema::compile(&json!({"id": "^[a-z]+$", "count": {".type": "integer"}})).unwrap();
///
/// assert!(schema.validate(&json!({"id": "abc", "count": 3}), &JsonPath::root()).is_success());
/// assert!(schema.validate(&json!({"id": "ABC", "count": 3}), &JsonPath::root()).is_failure());
/// ```
pub struct Schema;

impl Schema {
    /// Compiles a definition with the default compiler (prefix `.`, no registry).
    pub fn compile(definition: &Value) -> Result<SchemaNode, CompileError> {
        Compiler::new().compile(definition)
    }

    /// Returns a configurable compiler.
    pub fn compiler() -> Compiler {
        Compiler::new()
    }
}

/// Renders a value compactly for error messages.
pub(crate) fn render(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}

/// Formats a number without a trailing `.0` when it is whole.
pub(crate) fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Converts an arithmetic result back into a JSON number.
pub(crate) fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Some(Value::from(n as i64))
    } else {
        serde_json::Number::from_f64(n).map(Value::Number)
    }
}

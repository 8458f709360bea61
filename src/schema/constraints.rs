//! The constraint vocabulary of a schema node.
//!
//! Every constraint name a definition may use is resolved once, at compile
//! time, into a typed field of [`Constraints`]. Evaluation never looks a
//! constraint up by name.

use std::fmt::{self, Display};
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::format::Format;
use crate::path::SourcePath;

use super::SchemaNode;

/// A caller-supplied `eval` predicate.
///
/// Returning `Ok(false)` rejects the value; returning `Err` rejects it and
/// the message becomes the error's cause.
pub type Predicate = Arc<dyn Fn(&Value) -> Result<bool, String> + Send + Sync>;

/// A caller-supplied `transform` function, applied to `(target, value)`.
pub type TransformFn = Arc<dyn Fn(Option<&Value>, &Value) -> Result<Value, String> + Send + Sync>;

/// The semantic class of a document value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Object,
    Array,
    String,
    Number,
    /// A number with no fractional part; only ever declared, never classified.
    Integer,
    Boolean,
    Null,
}

impl TypeTag {
    /// Classifies a value. Total: every value gets exactly one tag, and
    /// numbers always classify as [`TypeTag::Number`].
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => TypeTag::Object,
            Value::Array(_) => TypeTag::Array,
            Value::String(_) => TypeTag::String,
            Value::Number(_) => TypeTag::Number,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Null => TypeTag::Null,
        }
    }

    /// Returns true if a value satisfies this declared type.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeTag::Integer, Value::Number(n)) => n.as_f64().is_some_and(|f| f.fract() == 0.0),
            (declared, value) => *declared == TypeTag::of(value),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Object => "object",
            TypeTag::Array => "array",
            TypeTag::String => "string",
            TypeTag::Number => "number",
            TypeTag::Integer => "integer",
            TypeTag::Boolean => "boolean",
            TypeTag::Null => "null",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "object" => TypeTag::Object,
            "array" => TypeTag::Array,
            "string" => TypeTag::String,
            "number" => TypeTag::Number,
            "integer" => TypeTag::Integer,
            "boolean" => TypeTag::Boolean,
            "null" => TypeTag::Null,
            _ => return None,
        })
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The `eval` constraint.
#[derive(Clone)]
pub(crate) struct Eval {
    pub(crate) name: String,
    pub(crate) predicate: Predicate,
    pub(crate) deferred: bool,
}

/// One `exists` rule: at least `count` members must satisfy `schema`.
pub(crate) struct ExistsRule {
    pub(crate) schema: SchemaNode,
    pub(crate) count: usize,
}

/// Where an `inject` entry goes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InjectAt {
    Key(String),
    Index(i64),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Case {
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortOrder {
    Ascending,
    Descending,
}

/// The in-place arithmetic a number node applies against its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Midpoint of target and value.
    Mean,
    /// Moves the target toward the value by the given weight.
    Weighted(f64),
}

/// Derived scalars extracted from a date-like value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateField {
    Year,
    YearName,
    Month,
    MonthName,
    Day,
    DayNum,
    DayName,
}

/// Where `fill`/`list` gather their values from.
pub(crate) enum Source {
    Paths(Vec<SourcePath>),
    Schema(Box<SchemaNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceMode {
    Fill,
    List,
}

/// The typed constraint set of one schema node.
#[derive(Default)]
pub(crate) struct Constraints {
    // validation
    pub(crate) types: Option<Vec<TypeTag>>,
    pub(crate) optional: bool,
    pub(crate) min: Option<f64>,
    pub(crate) max: Option<f64>,
    pub(crate) length: Option<usize>,
    pub(crate) exclusive_min: Option<f64>,
    pub(crate) exclusive_max: Option<f64>,
    pub(crate) modulo: Option<(f64, f64)>,
    pub(crate) pattern: Option<Regex>,
    pub(crate) format: Option<Format>,
    pub(crate) unique: bool,
    pub(crate) eval: Option<Eval>,
    pub(crate) error: Option<String>,
    pub(crate) invalid: bool,

    // structural matching
    pub(crate) match_children: Vec<(Regex, SchemaNode)>,
    pub(crate) all: Option<Box<SchemaNode>>,
    pub(crate) sequence: Option<Vec<SchemaNode>>,
    pub(crate) exists: Vec<ExistsRule>,
    pub(crate) extras: Option<Box<SchemaNode>>,
    pub(crate) dependencies: IndexMap<String, SchemaNode>,
    pub(crate) key_test: Option<Box<SchemaNode>>,
    pub(crate) ad_hoc: bool,
    pub(crate) tolerant: bool,
    pub(crate) recurse: Option<usize>,

    // polymorphic combination
    pub(crate) any_of: Vec<SchemaNode>,
    pub(crate) one_of: Vec<SchemaNode>,
    pub(crate) not: Option<Box<SchemaNode>>,

    // transform
    pub(crate) transform: Option<(String, TransformFn)>,
    pub(crate) cast: bool,
    pub(crate) split: Option<String>,
    pub(crate) date_field: Option<DateField>,
    pub(crate) total: bool,
    pub(crate) mean: bool,
    pub(crate) as_elem: bool,
    pub(crate) filter: Option<Box<SchemaNode>>,
    pub(crate) rename: IndexMap<String, String>,
    pub(crate) drop: Vec<String>,
    pub(crate) clip: Option<i64>,
    pub(crate) inject: Vec<(InjectAt, Value)>,
    pub(crate) insert: Option<i64>,
    pub(crate) append: bool,
    pub(crate) prepend: bool,
    pub(crate) sort: Option<SortOrder>,
    pub(crate) partial: Option<(i64, Option<i64>)>,
    pub(crate) case: Option<Case>,
    pub(crate) arithmetic: Option<Arithmetic>,
    pub(crate) normal: Option<f64>,
    pub(crate) mod_filter: Option<f64>,
    pub(crate) inverse: bool,
    pub(crate) reciprocal: bool,
    pub(crate) default: Option<Value>,

    // accumulation
    pub(crate) source: Option<(SourceMode, Source)>,
    pub(crate) group: Option<Box<SchemaNode>>,
    pub(crate) group_transform: Option<Box<SchemaNode>>,
}

impl Constraints {
    /// True if only `null` is admitted.
    pub(crate) fn is_null_only(&self) -> bool {
        matches!(self.types.as_deref(), Some([TypeTag::Null]))
    }

    /// True if a value of this class is admitted by the declared types.
    pub(crate) fn admits(&self, value: &Value) -> bool {
        match &self.types {
            Some(types) => types.iter().any(|t| t.admits(value)),
            None => true,
        }
    }

    /// The first declared type admitting `value`, or its classified type.
    pub(crate) fn resolve_type(&self, value: &Value) -> Option<TypeTag> {
        match &self.types {
            Some(types) => types.iter().copied().find(|t| t.admits(value)),
            None => Some(TypeTag::of(value)),
        }
    }

    pub(crate) fn type_names(&self) -> String {
        match &self.types {
            Some(types) => types.iter().map(TypeTag::name).collect::<Vec<_>>().join("|"),
            None => "any".to_string(),
        }
    }

    /// True if `insert`, `append` or `prepend` chooses a merge strategy.
    pub(crate) fn merges(&self) -> bool {
        self.insert.is_some() || self.append || self.prepend
    }
}

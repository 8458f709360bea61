//! Compilation of declarative definitions into schema nodes.
//!
//! A definition is a JSON value. Object keys beginning with the constraint
//! prefix (`.` by default) are constraints; every other key declares a child.
//! Plain leaves are shorthands:
//!
//! | Definition | Compiles to |
//! |---|---|
//! | `true` / `false` | boolean leaf |
//! | non-zero number `n` | number leaf dividing by `n` (`normal`) |
//! | `0` | number leaf |
//! | string | string leaf matched against the string as a regular expression |
//! | array | array leaf with a positional `sequence` |
//! | `null` | null leaf |

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::format::{Format, FormatError};
use crate::path::SourcePath;
use crate::registry::Registry;

use super::constraints::{
    Arithmetic, Case, Constraints, DateField, Eval, ExistsRule, InjectAt, SortOrder, Source,
    SourceMode, TypeTag,
};
use super::SchemaNode;

/// Errors raised while compiling a definition.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The constraint name is not part of the vocabulary.
    #[error("unknown constraint '{0}'")]
    UnknownConstraint(String),

    /// The constraint's value has the wrong shape.
    #[error("invalid value for constraint '{name}': {reason}")]
    InvalidConstraint { name: String, reason: String },

    /// A regular expression did not compile.
    #[error("invalid pattern for constraint '{name}': {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// A named `eval` or `transform` function is not registered.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A `type` name is not recognised.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// A `format` name is not recognised.
    #[error(transparent)]
    Format(#[from] FormatError),
}

fn invalid(name: &str, reason: impl Into<String>) -> CompileError {
    CompileError::InvalidConstraint {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn flag(name: &str, value: &Value) -> Result<bool, CompileError> {
    value.as_bool().ok_or_else(|| invalid(name, "expected a boolean"))
}

fn number(name: &str, value: &Value) -> Result<f64, CompileError> {
    value.as_f64().ok_or_else(|| invalid(name, "expected a number"))
}

fn integer(name: &str, value: &Value) -> Result<i64, CompileError> {
    value.as_i64().ok_or_else(|| invalid(name, "expected an integer"))
}

fn count(name: &str, value: &Value) -> Result<usize, CompileError> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| invalid(name, "expected a non-negative integer"))
}

fn text<'v>(name: &str, value: &'v Value) -> Result<&'v str, CompileError> {
    value.as_str().ok_or_else(|| invalid(name, "expected a string"))
}

fn pattern(name: &str, source: &str) -> Result<Regex, CompileError> {
    Regex::new(source).map_err(|source| CompileError::Pattern {
        name: name.to_string(),
        source,
    })
}

/// Builds [`SchemaNode`] trees from definitions.
///
/// # Example
///
/// ```rust
/// use schemata::{JsonPath, Registry, Schema};
/// use serde_json::json;
///
/// let registry = Registry::new();
/// registry
///     .register_predicate("even", |v| Ok(v.as_i64().is_some_and(|n| n % 2 == 0)))
///     .unwrap();
///
/// let schema = Schema::compiler()
///     .prefix("$")
///     .with_registry(&registry)
///     .compile(&json!({"$type": "integer", "$eval": "even"}))
///     .unwrap();
///
/// assert!(schema.validate(&json!(4), &JsonPath::root()).is_success());
/// assert!(schema.validate(&json!(3), &JsonPath::root()).is_failure());
/// ```
#[derive(Clone)]
pub struct Compiler {
    prefix: String,
    registry: Option<Registry>,
}

impl Compiler {
    /// Creates a compiler using the `.` prefix and no registry.
    pub fn new() -> Self {
        Self {
            prefix: ".".to_string(),
            registry: None,
        }
    }

    /// Sets the marker distinguishing constraint names from child names.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Resolves `eval` and `transform` names against `registry`.
    pub fn with_registry(mut self, registry: &Registry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    /// Compiles a definition.
    pub fn compile(&self, definition: &Value) -> Result<SchemaNode, CompileError> {
        let mut constraints = Constraints::default();
        let mut children = IndexMap::new();

        match definition {
            Value::Bool(_) => constraints.types = Some(vec![TypeTag::Boolean]),
            Value::Number(n) => {
                constraints.types = Some(vec![TypeTag::Number]);
                let divisor = n.as_f64().unwrap_or(0.0);
                if divisor != 0.0 {
                    constraints.normal = Some(divisor);
                }
            }
            Value::String(source) => {
                constraints.types = Some(vec![TypeTag::String]);
                constraints.pattern = Some(pattern("match", source)?);
            }
            Value::Array(_) => {
                constraints.types = Some(vec![TypeTag::Array]);
                constraints.sequence = Some(self.compile_all("sequence", definition)?);
            }
            Value::Null => constraints.types = Some(vec![TypeTag::Null]),
            Value::Object(map) => {
                let mut deferred = false;
                for (key, value) in map {
                    match key.strip_prefix(self.prefix.as_str()) {
                        Some("async") => deferred = flag("async", value)?,
                        Some(name) => self.constraint(&mut constraints, name, value)?,
                        None => {
                            children.insert(key.clone(), self.compile(value)?);
                        }
                    }
                }
                if let Some(eval) = constraints.eval.as_mut() {
                    eval.deferred = deferred;
                }
                if !children.is_empty() && constraints.types.is_none() {
                    constraints.types = Some(vec![TypeTag::Object]);
                }
            }
        }

        Ok(SchemaNode::new(constraints, children))
    }

    fn compile_boxed(&self, definition: &Value) -> Result<Option<Box<SchemaNode>>, CompileError> {
        Ok(Some(Box::new(self.compile(definition)?)))
    }

    fn compile_all(&self, name: &str, definition: &Value) -> Result<Vec<SchemaNode>, CompileError> {
        match definition {
            Value::Array(items) => items.iter().map(|item| self.compile(item)).collect(),
            _ => Err(invalid(name, "expected an array of definitions")),
        }
    }

    fn constraint(&self, c: &mut Constraints, name: &str, value: &Value) -> Result<(), CompileError> {
        match name {
            "type" => c.types = parse_types(value)?,
            "optional" => c.optional = flag(name, value)?,
            "min" => c.min = Some(number(name, value)?),
            "max" => c.max = Some(number(name, value)?),
            "length" => c.length = Some(count(name, value)?),
            "exclusiveMin" => c.exclusive_min = Some(number(name, value)?),
            "exclusiveMax" => c.exclusive_max = Some(number(name, value)?),
            "modulo" => c.modulo = Some(parse_modulo(value)?),
            "match" => c.pattern = Some(pattern(name, text(name, value)?)?),
            "format" => c.format = Some(text(name, value)?.parse::<Format>()?),
            "unique" | "uniqueItems" | "uniqueProperties" => c.unique = flag(name, value)?,
            "eval" => {
                let function = text(name, value)?;
                let predicate = self
                    .registry
                    .as_ref()
                    .and_then(|r| r.predicate(function))
                    .ok_or_else(|| CompileError::UnknownFunction(function.to_string()))?;
                c.eval = Some(Eval {
                    name: function.to_string(),
                    predicate,
                    deferred: false,
                });
            }
            "error" => c.error = Some(text(name, value)?.to_string()),
            "invalid" => c.invalid = flag(name, value)?,

            "matchChildren" => {
                let map = value
                    .as_object()
                    .ok_or_else(|| invalid(name, "expected an object of pattern -> definition"))?;
                for (source, definition) in map {
                    c.match_children
                        .push((pattern(name, source)?, self.compile(definition)?));
                }
            }
            "all" => c.all = self.compile_boxed(value)?,
            "sequence" => c.sequence = Some(self.compile_all(name, value)?),
            "exists" => c.exists = self.parse_exists(value)?,
            "extras" => c.extras = self.compile_boxed(value)?,
            "dependencies" => {
                let map = value
                    .as_object()
                    .ok_or_else(|| invalid(name, "expected an object of key -> definition"))?;
                for (key, definition) in map {
                    c.dependencies.insert(key.clone(), self.compile(definition)?);
                }
            }
            "keyTest" => c.key_test = self.compile_boxed(value)?,
            "adHoc" | "arbitrary" => c.ad_hoc = flag(name, value)?,
            "tolerant" => c.tolerant = flag(name, value)?,
            "recurse" => c.recurse = Some(count(name, value)?),

            "anyOf" => c.any_of = self.compile_all(name, value)?,
            "oneOf" => c.one_of = self.compile_all(name, value)?,
            "not" => c.not = self.compile_boxed(value)?,

            "transform" => {
                let function = text(name, value)?;
                let f = self
                    .registry
                    .as_ref()
                    .and_then(|r| r.transform_fn(function))
                    .ok_or_else(|| CompileError::UnknownFunction(function.to_string()))?;
                c.transform = Some((function.to_string(), f));
            }
            "cast" => c.cast = flag(name, value)?,
            "split" => c.split = Some(text(name, value)?.to_string()),
            "getYear" | "getYearName" | "getMonth" | "getMonthName" | "getDay" | "getDayNum"
            | "getDayName" => {
                if flag(name, value)? {
                    if c.date_field.is_some() {
                        return Err(invalid(name, "only one date extraction is allowed"));
                    }
                    c.date_field = Some(parse_date_field(name));
                }
            }
            "total" => c.total = flag(name, value)?,
            "mean" => c.mean = flag(name, value)?,
            "asElem" => c.as_elem = flag(name, value)?,
            "filter" => c.filter = self.compile_boxed(value)?,
            "rename" => {
                let map = value
                    .as_object()
                    .ok_or_else(|| invalid(name, "expected an object of from -> to"))?;
                for (from, to) in map {
                    c.rename.insert(from.clone(), text(name, to)?.to_string());
                }
            }
            "drop" => {
                c.drop = match value {
                    Value::String(key) => vec![key.clone()],
                    Value::Array(keys) => keys
                        .iter()
                        .map(|k| text(name, k).map(str::to_string))
                        .collect::<Result<_, _>>()?,
                    _ => return Err(invalid(name, "expected a key or an array of keys")),
                }
            }
            "clip" => c.clip = Some(integer(name, value)?),
            "inject" => c.inject = parse_inject(value)?,
            "insert" => c.insert = Some(integer(name, value)?),
            "append" => c.append = flag(name, value)?,
            "prepend" => c.prepend = flag(name, value)?,
            "sort" => c.sort = parse_sort(value)?,
            "partial" => c.partial = Some(parse_partial(value)?),
            "case" => {
                c.case = Some(match text(name, value)? {
                    "upper" => Case::Upper,
                    "lower" => Case::Lower,
                    _ => return Err(invalid(name, "expected \"upper\" or \"lower\"")),
                })
            }
            "add" | "subtract" | "multiply" | "divide" | "average" => {
                if let Some(op) = parse_arithmetic(name, value)? {
                    if c.arithmetic.is_some() {
                        return Err(invalid(name, "only one arithmetic operator is allowed"));
                    }
                    c.arithmetic = Some(op);
                }
            }
            "normal" => c.normal = Some(number(name, value)?),
            "modFilter" => c.mod_filter = Some(number(name, value)?),
            "inverse" => c.inverse = flag(name, value)?,
            "reciprocal" => c.reciprocal = flag(name, value)?,
            "default" => c.default = Some(value.clone()),

            "fill" | "list" => {
                if c.source.is_some() {
                    return Err(invalid(name, "only one of fill or list is allowed"));
                }
                let mode = if name == "fill" {
                    SourceMode::Fill
                } else {
                    SourceMode::List
                };
                c.source = Some((mode, self.parse_source(name, value)?));
            }
            "group" => c.group = self.compile_boxed(value)?,
            "groupTransform" => c.group_transform = self.compile_boxed(value)?,

            other => return Err(CompileError::UnknownConstraint(other.to_string())),
        }
        Ok(())
    }

    fn parse_exists(&self, value: &Value) -> Result<Vec<ExistsRule>, CompileError> {
        let rule = |definition: &Value| -> Result<ExistsRule, CompileError> {
            match definition {
                Value::Array(pair) if pair.len() == 2 && pair[1].is_u64() => Ok(ExistsRule {
                    schema: self.compile(&pair[0])?,
                    count: count("exists", &pair[1])?,
                }),
                other => Ok(ExistsRule {
                    schema: self.compile(other)?,
                    count: 1,
                }),
            }
        };
        match value {
            Value::Array(rules) => rules.iter().map(rule).collect(),
            other => Ok(vec![rule(other)?]),
        }
    }

    fn parse_source(&self, name: &str, value: &Value) -> Result<Source, CompileError> {
        match value {
            Value::String(path) => Ok(Source::Paths(vec![SourcePath::parse(path)])),
            Value::Array(paths) => paths
                .iter()
                .map(|p| text(name, p).map(SourcePath::parse))
                .collect::<Result<_, _>>()
                .map(Source::Paths),
            Value::Object(_) => Ok(Source::Schema(Box::new(self.compile(value)?))),
            _ => Err(invalid(name, "expected a path, an array of paths, or a definition")),
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_types(value: &Value) -> Result<Option<Vec<TypeTag>>, CompileError> {
    let parse = |v: &Value| -> Result<Option<TypeTag>, CompileError> {
        let name = text("type", v)?;
        if name == "any" {
            return Ok(None);
        }
        TypeTag::from_name(name)
            .map(Some)
            .ok_or_else(|| CompileError::UnknownType(name.to_string()))
    };
    match value {
        Value::Array(names) => {
            let mut types = Vec::with_capacity(names.len());
            for name in names {
                match parse(name)? {
                    Some(tag) => types.push(tag),
                    None => return Ok(None),
                }
            }
            Ok(Some(types))
        }
        single => Ok(parse(single)?.map(|tag| vec![tag])),
    }
}

fn parse_modulo(value: &Value) -> Result<(f64, f64), CompileError> {
    let (divisor, remainder) = match value {
        Value::Array(pair) if pair.len() == 2 => (number("modulo", &pair[0])?, number("modulo", &pair[1])?),
        other => (number("modulo", other)?, 0.0),
    };
    if divisor == 0.0 {
        return Err(invalid("modulo", "divisor must not be zero"));
    }
    Ok((divisor, remainder))
}

fn parse_inject(value: &Value) -> Result<Vec<(InjectAt, Value)>, CompileError> {
    match value {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (InjectAt::Key(k.clone()), v.clone()))
            .collect()),
        Value::Array(entries) => entries
            .iter()
            .map(|entry| match entry.as_array().map(Vec::as_slice) {
                Some([value]) => Ok((InjectAt::End, value.clone())),
                Some([at, value]) => {
                    let at = at.as_i64().map_or(InjectAt::End, InjectAt::Index);
                    Ok((at, value.clone()))
                }
                _ => Err(invalid("inject", "expected [value] or [index, value] entries")),
            })
            .collect(),
        _ => Err(invalid("inject", "expected an object or an array of entries")),
    }
}

fn parse_sort(value: &Value) -> Result<Option<SortOrder>, CompileError> {
    match value {
        Value::Bool(true) => Ok(Some(SortOrder::Ascending)),
        Value::Bool(false) => Ok(None),
        Value::String(order) if order == "asc" => Ok(Some(SortOrder::Ascending)),
        Value::String(order) if order == "desc" => Ok(Some(SortOrder::Descending)),
        _ => Err(invalid("sort", "expected true, \"asc\" or \"desc\"")),
    }
}

fn parse_partial(value: &Value) -> Result<(i64, Option<i64>), CompileError> {
    match value.as_array().map(Vec::as_slice) {
        Some([start]) => Ok((integer("partial", start)?, None)),
        Some([start, end]) => Ok((integer("partial", start)?, Some(integer("partial", end)?))),
        _ => Err(invalid("partial", "expected [start] or [start, end]")),
    }
}

fn parse_arithmetic(name: &str, value: &Value) -> Result<Option<Arithmetic>, CompileError> {
    if name == "average" {
        if let Some(weight) = value.as_f64() {
            return Ok(Some(Arithmetic::Weighted(weight)));
        }
    }
    if !flag(name, value)? {
        return Ok(None);
    }
    Ok(Some(match name {
        "add" => Arithmetic::Add,
        "subtract" => Arithmetic::Subtract,
        "multiply" => Arithmetic::Multiply,
        "divide" => Arithmetic::Divide,
        _ => Arithmetic::Mean,
    }))
}

fn parse_date_field(name: &str) -> DateField {
    match name {
        "getYear" => DateField::Year,
        "getYearName" => DateField::YearName,
        "getMonth" => DateField::Month,
        "getMonthName" => DateField::MonthName,
        "getDay" => DateField::Day,
        "getDayNum" => DateField::DayNum,
        _ => DateField::DayName,
    }
}

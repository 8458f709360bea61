//! Paths into document trees.
//!
//! [`JsonPath`] locates a failure (`users[0].email`); [`SourcePath`] is a
//! slash-separated path expression (`users/email`) that the accumulator
//! resolves against a root document, fanning out over every array it meets.

use std::fmt::{self, Display};

use serde_json::Value;

/// A segment of a [`JsonPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// An object key (e.g. `user`, `email`)
    Field(String),
    /// An array position (e.g. `[0]`)
    Index(usize),
}

/// The location of a value in a nested document.
///
/// # Example
///
/// ```rust
/// use schemata::JsonPath;
///
/// let path = JsonPath::root()
///     .push_field("users")
///     .push_index(0)
///     .push_field("email");
///
/// assert_eq!(path.to_string(), "users[0].email");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// Creates an empty path representing the root value.
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a path from a single field segment.
    pub fn from_field(name: impl Into<String>) -> Self {
        Self::root().push_field(name)
    }

    /// Returns a new path with a field segment appended.
    pub fn push_field(&self, name: impl Into<String>) -> Self {
        self.push(PathSegment::Field(name.into()))
    }

    /// Returns a new path with an index segment appended.
    pub fn push_index(&self, index: usize) -> Self {
        self.push(PathSegment::Index(index))
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }

    /// Returns true if this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments in this path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if this path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns an iterator over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    /// Returns the last segment, or None if this is root.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }
}

impl Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i > 0 => write!(f, ".{}", name)?,
                PathSegment::Field(name) => f.write_str(name)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// A slash-separated path expression used by `fill`/`list` sources.
///
/// Steps are split on unescaped `/`; `\/` is a literal slash inside a step and
/// empty steps are ignored. Resolution walks object keys from the root and, on
/// meeting an array with steps still to go, applies the remaining steps to
/// every element. Unresolvable branches contribute nothing.
///
/// # Example
///
/// ```rust
/// use schemata::SourcePath;
/// use serde_json::json;
///
/// let root = json!({"a": [{"b": 1}, {"b": 2}, {"b": 3}]});
/// let found = SourcePath::parse("a/b").resolve(&root);
/// assert_eq!(found, vec![json!(1), json!(2), json!(3)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePath {
    raw: String,
    steps: Vec<String>,
}

impl SourcePath {
    /// Parses a path expression.
    pub fn parse(raw: &str) -> Self {
        let mut steps = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => current.push('\\'),
                },
                '/' => {
                    if !current.is_empty() {
                        steps.push(std::mem::take(&mut current));
                    }
                }
                other => current.push(other),
            }
        }
        if !current.is_empty() {
            steps.push(current);
        }
        Self {
            raw: raw.to_string(),
            steps,
        }
    }

    /// Returns the parsed steps.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Resolves this path against `root`, returning every reachable value in
    /// document order.
    pub fn resolve(&self, root: &Value) -> Vec<Value> {
        let mut found = Vec::new();
        walk(root, &self.steps, &mut found);
        found
    }
}

impl Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn walk(pointer: &Value, steps: &[String], found: &mut Vec<Value>) {
    let Some((step, rest)) = steps.split_first() else {
        found.push(pointer.clone());
        return;
    };
    match pointer {
        Value::Array(items) => {
            for item in items {
                walk(item, steps, found);
            }
        }
        Value::Object(map) => {
            if let Some(next) = map.get(step) {
                walk(next, rest, found);
            }
        }
        _ => {}
    }
}

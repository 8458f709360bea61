//! Deduplication of document values.
//!
//! [`UniquenessSet`] backs the `unique` constraint on arrays and objects.
//! Values are bucketed into strings, numbers and everything else; the last
//! bucket is searched linearly with [`deep_equal`]. A number and its string
//! rendering live in different buckets and are never duplicates of each other.

use indexmap::{IndexMap, IndexSet};
use serde_json::{Number, Value};

/// Structural equality between two document values.
///
/// Numbers compare by numeric value (`1` equals `1.0`), objects compare by
/// key count and key-wise equality regardless of key order, arrays compare
/// index-wise.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => number_key(x) == number_key(y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| deep_equal(v, other)))
        }
        _ => false,
    }
}

/// Hashable identity of a number; `-0.0` and `0.0` share a key.
fn number_key(n: &Number) -> u64 {
    match n.as_f64() {
        Some(f) if f == 0.0 => 0.0f64.to_bits(),
        Some(f) => f.to_bits(),
        None => 0,
    }
}

/// A set of document values under deep equality.
///
/// # Example
///
/// ```rust
/// use schemata::UniquenessSet;
/// use serde_json::json;
///
/// let mut set = UniquenessSet::new();
/// assert!(set.add(&json!({"a": [1, 2]})));
/// assert!(!set.add(&json!({"a": [1, 2]})));
/// assert!(set.add(&json!("1")));
/// assert!(set.add(&json!(1)));
/// assert_eq!(set.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct UniquenessSet {
    strings: IndexSet<String>,
    numbers: IndexMap<u64, Number>,
    others: Vec<Value>,
}

impl UniquenessSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set seeded from `values`; duplicates count once.
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut set = Self::new();
        for value in values {
            set.add(value);
        }
        set
    }

    /// Registers `value`, returning false if an equal value was already present.
    pub fn add(&mut self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.strings.insert(s.clone()),
            Value::Number(n) => {
                let key = number_key(n);
                if self.numbers.contains_key(&key) {
                    false
                } else {
                    self.numbers.insert(key, n.clone());
                    true
                }
            }
            other => {
                if self.others.iter().any(|seen| deep_equal(seen, other)) {
                    false
                } else {
                    self.others.push(other.clone());
                    true
                }
            }
        }
    }

    /// Returns true if an equal value is present.
    pub fn contains_value(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.strings.contains(s),
            Value::Number(n) => self.numbers.contains_key(&number_key(n)),
            other => self.others.iter().any(|seen| deep_equal(seen, other)),
        }
    }

    /// Returns true if every value of `other` is present in this set.
    pub fn contains(&self, other: &UniquenessSet) -> bool {
        other.strings.iter().all(|s| self.strings.contains(s))
            && other.numbers.keys().all(|k| self.numbers.contains_key(k))
            && other
                .others
                .iter()
                .all(|v| self.others.iter().any(|seen| deep_equal(seen, v)))
    }

    /// Returns true if both sets hold exactly the same values.
    pub fn equals(&self, other: &UniquenessSet) -> bool {
        self.strings.len() == other.strings.len()
            && self.numbers.len() == other.numbers.len()
            && self.others.len() == other.others.len()
            && self.contains(other)
    }

    /// Returns the number of distinct values.
    pub fn len(&self) -> usize {
        self.strings.len() + self.numbers.len() + self.others.len()
    }

    /// Returns true if the set holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every distinct value: strings, then numbers, then composites.
    pub fn export(&self) -> Vec<Value> {
        self.strings
            .iter()
            .map(|s| Value::String(s.clone()))
            .chain(self.numbers.values().map(|n| Value::Number(n.clone())))
            .chain(self.others.iter().cloned())
            .collect()
    }
}

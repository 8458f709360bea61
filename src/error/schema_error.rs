//! Schema validation error types.
//!
//! This module provides [`SchemaError`] for single validation failures,
//! [`SchemaErrors`] for accumulating multiple errors, and [`ErrorKind`] for
//! classifying them.

use std::fmt::{self, Display};

use stillwater::prelude::*;

use crate::path::JsonPath;

/// The class of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required value is absent, or an `exists` rule found too few matches.
    Missing,
    /// The value's type does not match the declared type.
    Type,
    /// A length, key-count or numeric bound was violated.
    Limit,
    /// A pattern or string format did not match.
    Format,
    /// An unexpected key or item, or a duplicate under `unique`.
    Illegal,
    /// A predicate rejected the value, or a modulo/cast check failed.
    Invalid,
    /// A deferred predicate was reached without resolved results.
    Sync,
}

impl ErrorKind {
    /// Returns the upper-case name of this kind (e.g. `MISSING`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Missing => "MISSING",
            ErrorKind::Type => "TYPE",
            ErrorKind::Limit => "LIMIT",
            ErrorKind::Format => "FORMAT",
            ErrorKind::Illegal => "ILLEGAL",
            ErrorKind::Invalid => "INVALID",
            ErrorKind::Sync => "SYNC",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation error with full context.
///
/// `SchemaError` captures all relevant information about a validation failure:
/// - **kind**: The class of failure ([`ErrorKind`])
/// - **path**: Where in the document the error occurred
/// - **message**: Human-readable description of the failure
/// - **expected**: The offending constraint value (optional)
/// - **got**: The offending document value (optional)
/// - **cause**: The inner error raised by a failing predicate (optional)
///
/// # Example
///
/// ```rust
/// use schemata::{ErrorKind, JsonPath, SchemaError};
///
/// let error = SchemaError::new(
///     JsonPath::root().push_field("age"),
///     "value is below minimum"
/// )
/// .with_kind(ErrorKind::Limit)
/// .with_got("-5")
/// .with_expected("0");
///
/// assert_eq!(error.kind, ErrorKind::Limit);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    /// The path to the value that failed validation.
    pub path: JsonPath,
    /// Human-readable error message.
    pub message: String,
    /// The actual value that was received (rendered as JSON).
    pub got: Option<String>,
    /// The constraint value that was violated.
    pub expected: Option<String>,
    /// The class of this failure.
    pub kind: ErrorKind,
    /// The inner error raised by a failing `eval` predicate.
    pub cause: Option<String>,
    overridden: bool,
}

impl SchemaError {
    /// Creates a new schema error with the given path and message.
    ///
    /// The kind defaults to [`ErrorKind::Invalid`]. Use `with_kind` to set
    /// a more specific kind.
    pub fn new(path: JsonPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            got: None,
            expected: None,
            kind: ErrorKind::Invalid,
            cause: None,
            overridden: false,
        }
    }

    /// Sets the error kind and returns self for chaining.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the "got" (actual value) field and returns self for chaining.
    pub fn with_got(mut self, got: impl Into<String>) -> Self {
        self.got = Some(got.into());
        self
    }

    /// Sets the "expected" field and returns self for chaining.
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Sets the inner cause and returns self for chaining.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Replaces the message unless a deeper node already did.
    pub(crate) fn override_message(&mut self, message: &str) {
        if !self.overridden {
            self.message = message.to_string();
            self.overridden = true;
        }
    }
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path_str = if self.path.is_root() {
            "(root)".to_string()
        } else {
            self.path.to_string()
        };

        write!(f, "{} [{}]: {}", path_str, self.kind, self.message)?;

        if let Some(ref expected) = self.expected {
            write!(f, " (expected: {})", expected)?;
        }
        if let Some(ref got) = self.got {
            write!(f, " (got: {})", got)?;
        }
        if let Some(ref cause) = self.cause {
            write!(f, " (cause: {})", cause)?;
        }

        Ok(())
    }
}

impl std::error::Error for SchemaError {}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<SchemaError>();
    assert_sync::<SchemaError>();
};

/// A non-empty collection of schema validation errors.
///
/// `SchemaErrors` wraps a `NonEmptyVec<SchemaError>` to guarantee that at least
/// one error is present. This is essential for use with `Validation<T, SchemaErrors>`
/// since a failure must have at least one error.
///
/// # Combining Errors
///
/// `SchemaErrors` implements `Semigroup`, allowing errors from multiple
/// validations to be combined:
///
/// ```rust
/// use schemata::{JsonPath, SchemaError, SchemaErrors};
/// use stillwater::prelude::*;
///
/// let errors1 = SchemaErrors::single(
///     SchemaError::new(JsonPath::root().push_field("name"), "required")
/// );
/// let errors2 = SchemaErrors::single(
///     SchemaError::new(JsonPath::root().push_field("email"), "invalid format")
/// );
///
/// let combined = errors1.combine(errors2);
/// assert_eq!(combined.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaErrors(NonEmptyVec<SchemaError>);

impl SchemaErrors {
    /// Creates a `SchemaErrors` containing a single error.
    pub fn single(error: SchemaError) -> Self {
        Self(NonEmptyVec::singleton(error))
    }

    /// Returns the number of errors in this collection.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns false since this collection is guaranteed non-empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns an iterator over the contained errors.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaError> {
        self.0.iter()
    }

    /// Returns all errors at the specified path.
    pub fn at_path(&self, path: &JsonPath) -> Vec<&SchemaError> {
        self.0.iter().filter(|e| &e.path == path).collect()
    }

    /// Returns all errors of the specified kind.
    pub fn with_kind(&self, kind: ErrorKind) -> Vec<&SchemaError> {
        self.0.iter().filter(|e| e.kind == kind).collect()
    }

    /// Returns the first error in the collection.
    pub fn first(&self) -> &SchemaError {
        self.0.head()
    }

    /// Converts this collection into a `Vec<SchemaError>`.
    pub fn into_vec(self) -> Vec<SchemaError> {
        self.0.into_vec()
    }

    /// Creates a `SchemaErrors` from a `Vec<SchemaError>`.
    ///
    /// # Panics
    ///
    /// Panics if the provided vec is empty.
    pub fn from_vec(errors: Vec<SchemaError>) -> Self {
        Self(NonEmptyVec::from_vec(errors).expect("SchemaErrors requires at least one error"))
    }
}

impl Semigroup for SchemaErrors {
    fn combine(self, other: Self) -> Self {
        SchemaErrors(self.0.combine(other.0))
    }
}

impl Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation failed with {} error(s):", self.len())?;
        for (i, error) in self.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

impl IntoIterator for SchemaErrors {
    type Item = SchemaError;
    type IntoIter = std::vec::IntoIter<SchemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_vec().into_iter()
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<SchemaErrors>();
    assert_sync::<SchemaErrors>();
};

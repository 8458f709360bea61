//! Transform failure type.
//!
//! Transforms are all-or-nothing: the first failure aborts the whole call and
//! is reported as a plain descriptive [`TransformError`].

use std::fmt::{self, Display};

use crate::path::JsonPath;

/// A transform failure located within the document tree.
///
/// # Example
///
/// ```rust
/// use schemata::{JsonPath, TransformError};
///
/// let error = TransformError::new(JsonPath::from_field("tags"), "found unexpected array item");
/// assert_eq!(error.to_string(), "tags: found unexpected array item");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TransformError {
    /// Where in the document the transform failed.
    pub path: JsonPath,
    /// Human-readable description of the failure.
    pub message: String,
    overridden: bool,
}

impl TransformError {
    /// Creates a new transform error.
    pub fn new(path: JsonPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            overridden: false,
        }
    }

    /// Replaces the message unless a deeper node already did.
    pub(crate) fn override_message(mut self, message: Option<&str>) -> Self {
        if let Some(message) = message {
            if !self.overridden {
                self.message = message.to_string();
                self.overridden = true;
            }
        }
        self
    }
}

impl Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for TransformError {}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<TransformError>();
    assert_sync::<TransformError>();
};

//! # Schemata
//!
//! A declarative schema engine for JSON documents. One compiled schema
//! answers three questions about a `serde_json::Value`:
//!
//! - **validate**: does the document satisfy the schema? Every failure is
//!   reported, not just the first, through stillwater's `Validation` type.
//! - **transform**: merge a new value into a prior one under the schema's
//!   mutation constraints (arithmetic, append/prepend, rename, clip, sort,
//!   ...), producing a result that itself satisfies the schema.
//! - **accumulate**: gather values from elsewhere in a document by path and
//!   fold them through the schema's transform.
//!
//! ## Core Types
//!
//! - [`Schema`] / [`Compiler`]: compile a declarative definition into a [`SchemaNode`]
//! - [`SchemaError`] / [`SchemaErrors`]: accumulated validation failures
//! - [`TransformError`]: the single failure of an all-or-nothing transform
//! - [`JsonPath`]: locates a value in a document (e.g. `users[0].email`)
//! - [`Registry`]: named predicates, transform functions and schemas
//! - [`UniquenessSet`]: deep-equality value sets
//!
//! ## Example
//!
//! ```rust
//! use schemata::{JsonPath, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::compile(&json!({
//!     "visits": {".type": "integer", ".add": true, ".min": 0},
//!     "pages": {".type": "array", ".append": true, ".unique": true}
//! })).unwrap();
//!
//! let prior = json!({"visits": 3, "pages": ["/"]});
//! let next = schema
//!     .transform(Some(&prior), &json!({"visits": 1, "pages": ["/about"]}))
//!     .unwrap();
//!
//! assert_eq!(next, json!({"visits": 4, "pages": ["/", "/about"]}));
//! assert!(schema.validate(&next, &JsonPath::root()).is_success());
//! ```

pub(crate) mod context;
pub mod effect;
pub mod error;
pub mod format;
pub mod path;
pub mod registry;
pub mod schema;
pub mod unique;

pub use context::DEFAULT_MAX_DEPTH;
pub use effect::{CheckResults, PendingCheck, PendingChecks};
pub use error::{ErrorKind, SchemaError, SchemaErrors, TransformError};
pub use format::{validate_format, Format, FormatError};
pub use path::{JsonPath, PathSegment, SourcePath};
pub use registry::{Registry, RegistryError};
pub use schema::{CompileError, Compiler, NodeId, Predicate, Schema, SchemaNode, TransformFn, TypeTag};
pub use unique::{deep_equal, UniquenessSet};

/// Type alias for validation results using SchemaErrors
pub type ValidationResult<T> = stillwater::Validation<T, SchemaErrors>;

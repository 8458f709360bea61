//! Error types for validation and transform failures.
//!
//! Validation failures accumulate as [`SchemaErrors`]; transform failures
//! short-circuit as a single [`TransformError`].

mod schema_error;
mod transform_error;

pub use schema_error::{ErrorKind, SchemaError, SchemaErrors};
pub use transform_error::TransformError;

//! Deferred evaluation of asynchronous `eval` predicates.
//!
//! Validation itself is always synchronous. A predicate flagged `async`
//! cannot run inline: plain [`validate`](crate::SchemaNode::validate) reports
//! it as a `SYNC` error and transforms refuse it. Instead the caller runs the
//! two-phase protocol:
//!
//! 1. [`SchemaNode::collect_deferred`](crate::SchemaNode::collect_deferred)
//!    gathers the [`PendingChecks`] a document needs.
//! 2. The caller resolves them into [`CheckResults`] (for example with
//!    [`PendingChecks::run_parallel`]) and calls
//!    [`SchemaNode::validate_resolved`](crate::SchemaNode::validate_resolved).

mod deferred;

pub use deferred::{CheckResults, PendingCheck, PendingChecks};

//! Evaluation state threaded through validate, transform and accumulate.
//!
//! A [`Frame`] is pushed for every schema node entered; the chain of frames
//! is the ancestor list that `recurse` resolves against, and its length is
//! checked against the configured maximum depth.

use std::cell::RefCell;

use serde_json::Value;

use crate::effect::{CheckResults, PendingCheck};
use crate::schema::SchemaNode;

/// Default bound on nested node evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// One entered schema node and its ancestors.
#[derive(Clone, Copy)]
pub(crate) struct Frame<'a> {
    node: &'a SchemaNode,
    parent: Option<&'a Frame<'a>>,
    depth: usize,
}

impl<'a> Frame<'a> {
    pub(crate) fn enter(node: &'a SchemaNode, parent: Option<&'a Frame<'a>>) -> Self {
        Self {
            node,
            parent,
            depth: parent.map_or(0, |p| p.depth + 1),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the node `levels` frames up; 0 is this frame's own node.
    pub(crate) fn ancestor(&self, levels: usize) -> Option<&'a SchemaNode> {
        let mut frame = self;
        for _ in 0..levels {
            frame = frame.parent?;
        }
        Some(frame.node)
    }
}

/// How `eval` predicates flagged `async` are treated during validation.
pub(crate) enum Deferred<'r> {
    /// Reaching one is a `SYNC` error.
    Reject,
    /// Record it and treat it as passing.
    Collect(RefCell<Vec<PendingCheck>>),
    /// Look up its outcome.
    Resolved(&'r CheckResults),
}

pub(crate) struct ValidationContext<'r> {
    pub(crate) deferred: Deferred<'r>,
    pub(crate) max_depth: usize,
}

impl<'r> ValidationContext<'r> {
    pub(crate) fn strict(max_depth: usize) -> Self {
        Self {
            deferred: Deferred::Reject,
            max_depth,
        }
    }

    pub(crate) fn collecting(max_depth: usize) -> Self {
        Self {
            deferred: Deferred::Collect(RefCell::new(Vec::new())),
            max_depth,
        }
    }

    pub(crate) fn resolved(results: &'r CheckResults, max_depth: usize) -> Self {
        Self {
            deferred: Deferred::Resolved(results),
            max_depth,
        }
    }

    pub(crate) fn into_pending(self) -> Vec<PendingCheck> {
        match self.deferred {
            Deferred::Collect(pending) => pending.into_inner(),
            _ => Vec::new(),
        }
    }
}

pub(crate) struct TransformContext<'r> {
    pub(crate) root: &'r Value,
    pub(crate) max_depth: usize,
}

impl<'r> TransformContext<'r> {
    pub(crate) fn new(root: &'r Value, max_depth: usize) -> Self {
        Self { root, max_depth }
    }

    /// A validation context for `filter`, `keyTest` and `dependencies` checks.
    pub(crate) fn checker(&self) -> ValidationContext<'static> {
        ValidationContext::strict(self.max_depth)
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Two families exist. [`ConfigError`] is returned synchronously by mutating
//! calls whose arguments are unusable. [`ValidationError`] is produced while a
//! frame validates one entity; the scheduler never propagates it, it raises it
//! as a critical error on that entity and moves on.

use thiserror::Error;

use crate::NodeId;

/// A rejected mutation.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A zoom range was not a pair of finite fractions with `start <= end`.
    #[error("invalid zoom range {start}..{end}")]
    InvalidZoomRange {
        /// Requested start fraction.
        start: f64,
        /// Requested end fraction.
        end: f64,
    },
    /// A field name that the component does not declare.
    #[error("unknown data field `{0}`")]
    UnknownField(String),
    /// Another live node already uses this key.
    #[error("node key `{0}` is already in use")]
    DuplicateKey(String),
    /// The node cannot host children.
    #[error("{0:?} is not a composite node")]
    NotComposite(NodeId),
    /// The node carries no data-bound facet.
    #[error("{0:?} is not a data-bound node")]
    NotDataBound(NodeId),
    /// Attaching `child` under `parent` would make a node its own ancestor.
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// The would-be parent.
        parent: NodeId,
        /// The node being attached.
        child: NodeId,
    },
    /// Linking `user` to `provider` would make a component feed itself.
    #[error("{user:?} cannot consume data from {provider:?}: provider chain loops")]
    ProviderCycle {
        /// The would-be provider.
        provider: NodeId,
        /// The would-be data user.
        user: NodeId,
    },
    /// A record index past the end of the component's raw data.
    #[error("record index {index} is out of range for {len} records")]
    RecordOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of raw records.
        len: usize,
    },
}

/// Failure reported by a rendering backend.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct VisualError {
    message: String,
}

impl VisualError {
    /// Creates an error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the backend's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure while arranging a composite node.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The grid kept overflowing after the maximum number of column re-plans.
    #[error("grid layout did not converge after {replans} column re-plans")]
    GridDidNotConverge {
        /// Re-plans attempted.
        replans: u32,
    },
}

/// Failure while validating one entity during a frame.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationError {
    /// A raw record could not be turned into a data item.
    #[error("record {index}: {reason}")]
    Parse {
        /// Index of the offending record.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },
    /// Layout failed.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The backend refused to draw.
    #[error("draw failed: {0}")]
    Visual(#[from] VisualError),
}

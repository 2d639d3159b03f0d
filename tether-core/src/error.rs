//! Error types.

use thiserror::Error;

use crate::binding::ClassId;

/// Errors raised by the reactive primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// An observed signal was written outside `run_atomically` while the
    /// runtime enforces scoped mutation.
    #[error("signal {signal_id} is observed and may only be mutated inside run_atomically")]
    UnguardedMutation { signal_id: u64 },
}

/// Errors raised while declaring classes or binding instances.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("unknown class id {0}")]
    UnknownClass(ClassId),

    #[error("`{class}.{key}` is declared more than once")]
    DuplicateDeclaration { class: String, key: String },

    #[error("cannot bind `{class}`: instance is destroyed")]
    Destroyed { class: String },
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

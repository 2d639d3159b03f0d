//! Reactive Primitives
//!
//! This module is the reactive library the binding layer drives: signals,
//! effects, atomic batches, and the [`ReactiveBackend`] seam through which the
//! binder consumes them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. Reading it inside a running
//! computation registers that computation as a dependent; setting it re-runs
//! every dependent.
//!
//! ## Effects
//!
//! An Effect is an auto-run computation: it runs immediately and again each
//! time a signal it read on its previous run changes.
//!
//! ## Reactions
//!
//! A reaction splits "what changed" (a tracked selector) from "what to do"
//! (an untracked effect that only runs when the selected value changes). See
//! [`react_to_change`].
//!
//! ## Disposers
//!
//! Every subscription hands back a [`Disposer`]: an idempotent cleanup handle.
//!
//! # Implementation Notes
//!
//! Dependency tracking uses a thread-local context stack: a signal read checks
//! for a running computation and, if there is one, records the edge in the
//! global [`Runtime`]. Dispatch is synchronous.

mod backend;
mod context;
mod disposer;
mod effect;
mod runtime;
mod signal;
mod subscriber;

pub use backend::{
    react, react_to_change, ObserveOptions, ReactionOptions, ReactiveBackend, SignalBackend,
};
pub use context::ReactiveContext;
pub use disposer::Disposer;
pub use effect::Effect;
pub use runtime::{EnforceActions, Reactive, ReactiveHandle, Runtime};
pub use signal::Signal;
pub use subscriber::SubscriberId;

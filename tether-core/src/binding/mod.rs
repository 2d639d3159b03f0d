//! Lifecycle binding of reactive declarations.
//!
//! This module turns class-level declarations ("this method is an auto-run",
//! "this method is a reaction") into live subscriptions on instances whose
//! lifecycle belongs to a host system:
//!
//! - [`Registry`]: process-wide, append-only table of classes and the
//!   declarations each class body made.
//! - [`ReactiveClass`]: the declaration API and the cached, inheritance
//!   resolved declaration list of one type.
//! - [`DisposerLedger`]: per-instance live subscriptions, split by
//!   [`Scope`].
//! - [`Observer`]: the state machine driven by [`HostLifecycle`] hooks.

mod class;
mod declaration;
mod handle;
mod ledger;
mod lifecycle;
mod observer;
mod registry;

pub use class::{
    AutoRunFn, Method, ReactiveClass, ReactiveClassBuilder, ReactorFn, ResolvedDeclaration,
};
pub use declaration::{Declaration, DeclarationKind, DeclarationOptions, MethodKey};
pub use handle::{lens, Handle, Lens};
pub use ledger::{DisposerLedger, Scope};
pub use lifecycle::{BindCaller, BinderState, HostLifecycle};
pub use observer::Observer;
pub use registry::{ClassId, Registry};

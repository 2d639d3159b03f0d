//! Tether Core
//!
//! This crate binds reactive state to the lifecycle of view objects owned by
//! a host system. A type declares which of its methods are reactive; each
//! instance gets an [`Observer`](binding::Observer) that subscribes those
//! methods when the host enables the instance and disposes them when the
//! host disables or destroys it.
//!
//! # Architecture
//!
//! - `reactive`: signals, effects, atomic batches and the
//!   [`ReactiveBackend`](reactive::ReactiveBackend) seam the binder talks to
//! - `binding`: the declaration registry, the declaration API, the disposer
//!   ledger and the lifecycle binder
//! - `config`: JSON-loadable binder and runtime settings
//! - `error`: error types
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::binding::{HostLifecycle, Observer, ReactiveClass};
//! use tether_core::reactive::Signal;
//!
//! struct UpdateLabel {
//!     count: Signal<i32>,
//!     text: Signal<String>,
//! }
//!
//! let class = ReactiveClass::builder("UpdateLabel")
//!     .auto_run("render", |label: &UpdateLabel| {
//!         label.text.set(format!("count: {}", label.count.get()));
//!     })
//!     .build()?;
//!
//! let mut observer = Observer::new(class, UpdateLabel {
//!     count: Signal::new(0),
//!     text: Signal::new(String::new()),
//! });
//!
//! observer.on_enable();   // render runs: "count: 0"
//! observer.instance().count.set(5);
//! // render runs again: "count: 5"
//! observer.on_disable();  // render is disposed
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod reactive;

pub use binding::{
    BindCaller, BinderState, DeclarationOptions, HostLifecycle, MethodKey, Observer,
    ReactiveClass,
};
pub use config::{BinderConfig, RuntimeConfig};
pub use error::{BindError, ConfigError, ReactiveError};
pub use reactive::{Disposer, ReactiveBackend, Signal, SignalBackend};

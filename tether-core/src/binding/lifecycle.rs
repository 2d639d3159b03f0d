//! Host lifecycle contract.
//!
//! The host system owns object lifecycles and calls these hooks in a fixed
//! order: construction exactly once first (in Rust, building the
//! [`Observer`](super::Observer)), then `on_enable`/`on_disable` alternating
//! any number of times, then `on_destroy` at most once. `on_force_finalize`
//! may fire instead of, or after, `on_destroy` when the host skipped its
//! normal construction hooks. Hooks are never re-entered.

/// Inbound lifecycle hooks.
pub trait HostLifecycle {
    fn on_enable(&mut self);
    fn on_disable(&mut self);
    fn on_destroy(&mut self);
    fn on_force_finalize(&mut self);
}

/// Who asked for a bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindCaller {
    /// The host's enable hook.
    EnableHook,
    /// User code, outside the enable hook.
    Manual,
}

/// Where an observer is in its lifecycle.
///
/// `Unbound -> Bound -> (Disabled <-> Bound) -> Destroyed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinderState {
    Unbound,
    Bound,
    Disabled,
    Destroyed,
}

impl BinderState {
    pub fn is_destroyed(&self) -> bool {
        matches!(self, BinderState::Destroyed)
    }
}

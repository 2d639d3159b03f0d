//! Signal Implementation
//!
//! A Signal holds a value and notifies the computations that read it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a tracking context (an effect), the
//!    runtime records that computation as a subscriber.
//!
//! 2. When the value is set, the runtime re-runs every subscriber, or queues
//!    the notification if an atomic batch is open.
//!
//! Every `set` notifies, even when the new value equals the old one. Use a
//! reaction selector when only real changes should trigger work.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use crate::error::ReactiveError;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reactive signal holding a value of type T.
///
/// Clones share the same value and identity.
///
/// ```rust,ignore
/// let count = Signal::new(0);
/// let value = count.get();
/// Runtime::run_atomically(|| count.set(5));
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    id: u64,
    value: Arc<RwLock<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the current value, subscribing the running computation if any.
    pub fn get(&self) -> T {
        self.track();
        self.value.read().clone()
    }

    /// Borrow the current value, subscribing the running computation if any.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.value.read())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    fn track(&self) {
        if let Some(subscriber_id) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.id);
            Runtime::add_dependency(self.id, subscriber_id);
        }
    }

    /// Set a new value and notify subscribers.
    ///
    /// Under [`EnforceActions::Observed`](super::EnforceActions::Observed) a
    /// write to an observed signal outside `run_atomically` is logged but
    /// still performed.
    pub fn set(&self, value: T) {
        if Runtime::is_unguarded_mutation(self.id) {
            tracing::warn!(
                signal = self.id,
                "observed signal mutated outside run_atomically"
            );
        }
        self.write(value);
    }

    /// Set a new value, refusing writes the mutation policy forbids.
    pub fn try_set(&self, value: T) -> Result<(), ReactiveError> {
        if Runtime::is_unguarded_mutation(self.id) {
            return Err(ReactiveError::UnguardedMutation { signal_id: self.id });
        }
        self.write(value);
        Ok(())
    }

    fn write(&self, value: T) {
        *self.value.write() = value;
        Runtime::notify_signal_change(self.id);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = f(&self.value.read());
        self.set(new_value);
    }

    /// Get the number of computations currently reading this signal.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.id)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{EnforceActions, Effect};
    use std::sync::atomic::AtomicI32;

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_notifies_reading_effect() {
        let signal = Signal::new(0);
        let call_count = Arc::new(AtomicI32::new(0));

        let (s, count) = (signal.clone(), call_count.clone());
        let _effect = Effect::new(move || {
            s.with(|_| ());
            count.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(signal.subscriber_count(), 1);

        signal.set(1);
        signal.set(1);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn untracked_read_does_not_subscribe() {
        let signal = Signal::new(0);
        let s = signal.clone();
        let _effect = Effect::new(move || {
            s.get_untracked();
        });

        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn try_set_rejects_unguarded_write_to_observed_signal() {
        let signal = Signal::new(0);
        let s = signal.clone();
        let _effect = Effect::new(move || {
            s.get();
        });

        Runtime::set_enforce_actions(EnforceActions::Observed);
        let rejected = signal.try_set(1);
        let accepted = Runtime::run_atomically(|| signal.try_set(2));
        Runtime::set_enforce_actions(EnforceActions::Never);

        assert!(matches!(
            rejected,
            Err(ReactiveError::UnguardedMutation { signal_id }) if signal_id == signal.id()
        ));
        assert!(accepted.is_ok());
        assert_eq!(signal.get_untracked(), 2);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1.id(), signal2.id());
    }
}

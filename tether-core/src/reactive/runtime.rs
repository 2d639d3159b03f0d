//! Reactive Runtime
//!
//! The runtime is the process-wide coordinator between signals and the
//! computations that read them.
//!
//! # How It Works
//!
//! 1. A computation registers with the runtime and keeps the returned
//!    [`ReactiveHandle`] for as long as it is alive.
//!
//! 2. When the computation reads a signal inside its tracking context, the
//!    runtime records the edge `signal -> subscriber`.
//!
//! 3. When a signal is set, the runtime looks up its subscribers and schedules
//!    each live one. Scheduling is synchronous.
//!
//! 4. Inside [`Runtime::run_atomically`] notifications are queued instead of
//!    dispatched. The outermost batch flushes the queue on exit, once per
//!    signal, in the order the signals were first set.
//!
//! # Thread Safety
//!
//! The registry and the dependency table are global and guarded by
//! `parking_lot` locks. Batching state is per thread, matching the
//! single-threaded dispatch model: a batch opened on one thread never defers
//! notifications raised on another.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexSet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::context::ReactiveContext;
use super::subscriber::SubscriberId;

/// A computation the runtime can re-run when one of its signals changes.
pub trait Reactive: Send + Sync {
    /// Get the subscriber ID for this computation.
    fn subscriber_id(&self) -> SubscriberId;

    /// Re-run the computation because a dependency changed.
    fn schedule(&self);
}

/// Handle to a registered computation.
///
/// Dropping this handle unregisters the computation and forgets its
/// dependency edges.
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// Policy for writes to observed signals outside an atomic batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforceActions {
    /// Any write is allowed anywhere.
    #[default]
    Never,
    /// Writing a signal that has subscribers requires `run_atomically`.
    Observed,
}

impl EnforceActions {
    fn as_u8(self) -> u8 {
        match self {
            EnforceActions::Never => 0,
            EnforceActions::Observed => 1,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => EnforceActions::Observed,
            _ => EnforceActions::Never,
        }
    }
}

/// The global reactive runtime.
pub struct Runtime;

type Registry = RwLock<HashMap<SubscriberId, Weak<dyn Reactive>>>;
type SignalSubscribers = RwLock<HashMap<u64, IndexSet<SubscriberId>>>;

static REGISTRY: OnceLock<Registry> = OnceLock::new();
static SIGNAL_SUBSCRIBERS: OnceLock<SignalSubscribers> = OnceLock::new();
static ENFORCE_ACTIONS: AtomicU8 = AtomicU8::new(0);

fn get_registry() -> &'static Registry {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn get_signal_subscribers() -> &'static SignalSubscribers {
    SIGNAL_SUBSCRIBERS.get_or_init(|| RwLock::new(HashMap::new()))
}

#[derive(Default)]
struct Batch {
    depth: usize,
    pending: IndexSet<u64>,
}

thread_local! {
    static BATCH: RefCell<Batch> = RefCell::new(Batch::default());
}

/// Closes one level of batching; the outermost guard flushes.
struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let pending = BATCH.with(|batch| {
            let mut batch = batch.borrow_mut();
            batch.depth -= 1;
            if batch.depth == 0 {
                std::mem::take(&mut batch.pending)
            } else {
                IndexSet::new()
            }
        });

        // Never run user computations while unwinding.
        if std::thread::panicking() {
            return;
        }

        if !pending.is_empty() {
            tracing::trace!(signals = pending.len(), "flushing atomic batch");
        }
        let signal_ids: Vec<u64> = pending.into_iter().collect();
        Runtime::dispatch(&signal_ids);
    }
}

impl Runtime {
    /// Register a computation with the runtime.
    ///
    /// Returns a handle that unregisters the computation when dropped.
    pub fn register(reactive: Arc<dyn Reactive>) -> ReactiveHandle {
        let id = reactive.subscriber_id();

        get_registry().write().insert(id, Arc::downgrade(&reactive));

        ReactiveHandle { subscriber_id: id }
    }

    fn unregister(id: SubscriberId) {
        get_registry().write().remove(&id);
        Self::clear_dependencies(id);
    }

    /// Whether a computation with this id is currently registered.
    pub fn is_registered(id: SubscriberId) -> bool {
        get_registry().read().contains_key(&id)
    }

    /// Record that a subscriber depends on a signal.
    pub fn add_dependency(signal_id: u64, subscriber_id: SubscriberId) {
        get_signal_subscribers()
            .write()
            .entry(signal_id)
            .or_default()
            .insert(subscriber_id);
    }

    /// Remove all dependency edges of a subscriber.
    ///
    /// Called before re-running a computation so stale reads are forgotten.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        let mut subscribers = get_signal_subscribers().write();
        subscribers.retain(|_, subs| {
            subs.shift_remove(&subscriber_id);
            !subs.is_empty()
        });
    }

    /// Number of computations currently depending on a signal.
    pub fn subscriber_count(signal_id: u64) -> usize {
        get_signal_subscribers()
            .read()
            .get(&signal_id)
            .map_or(0, IndexSet::len)
    }

    /// Notify the subscribers of a changed signal, or queue the notification
    /// if an atomic batch is open on this thread.
    pub fn notify_signal_change(signal_id: u64) {
        let deferred = BATCH.with(|batch| {
            let mut batch = batch.borrow_mut();
            if batch.depth > 0 {
                batch.pending.insert(signal_id);
                true
            } else {
                false
            }
        });

        if !deferred {
            Self::dispatch(&[signal_id]);
        }
    }

    /// Schedule every subscriber of `signal_ids`, each exactly once.
    fn dispatch(signal_ids: &[u64]) {
        let subscriber_ids: IndexSet<SubscriberId> = {
            let subscribers = get_signal_subscribers().read();
            signal_ids
                .iter()
                .filter_map(|id| subscribers.get(id))
                .flat_map(|subs| subs.iter().copied())
                .collect()
        };
        if subscriber_ids.is_empty() {
            return;
        }

        let to_run: Vec<Arc<dyn Reactive>> = {
            let registry = get_registry().read();
            subscriber_ids
                .iter()
                .filter_map(|id| registry.get(id).and_then(Weak::upgrade))
                .collect()
        };

        // Locks are released before any computation runs.
        for reactive in to_run {
            reactive.schedule();
        }
    }

    /// Run `f` as one atomic mutation.
    ///
    /// Signal notifications raised inside `f` are delivered after the
    /// outermost `run_atomically` returns.
    pub fn run_atomically<R>(f: impl FnOnce() -> R) -> R {
        BATCH.with(|batch| batch.borrow_mut().depth += 1);
        let _guard = BatchGuard;
        f()
    }

    /// Whether the current thread is inside `run_atomically`.
    pub fn in_action() -> bool {
        BATCH.with(|batch| batch.borrow().depth > 0)
    }

    /// Install the process-wide scoped-mutation policy.
    pub fn set_enforce_actions(policy: EnforceActions) {
        ENFORCE_ACTIONS.store(policy.as_u8(), Ordering::Relaxed);
    }

    /// The process-wide scoped-mutation policy.
    pub fn enforce_actions() -> EnforceActions {
        EnforceActions::from_u8(ENFORCE_ACTIONS.load(Ordering::Relaxed))
    }

    /// Whether writing `signal_id` right now would violate the policy.
    pub fn is_unguarded_mutation(signal_id: u64) -> bool {
        Self::enforce_actions() == EnforceActions::Observed
            && !Self::in_action()
            && Self::subscriber_count(signal_id) > 0
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a tracking context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

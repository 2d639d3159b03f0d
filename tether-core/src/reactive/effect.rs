//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever a signal
//! it read on its previous run changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect registers with the [`Runtime`] and runs its
//!    function immediately to establish initial dependencies.
//!
//! 2. When any dependency changes, the runtime schedules the effect, which
//!    re-runs synchronously.
//!
//! 3. Before re-running, the effect forgets its old dependencies and tracks
//!    new ones during execution, so branches not taken stop triggering it.
//!
//! 4. After [`Effect::dispose`] the effect never runs again. Disposal is
//!    idempotent.
//!
//! An effect whose run causes one of its own dependencies to change is not
//! re-entered; the nested notification is dropped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::subscriber::SubscriberId;

/// Counter for generating unique effect IDs.
static EFFECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct EffectInner {
    id: u64,
    subscriber_id: SubscriberId,
    name: Option<String>,
    run: Arc<dyn Fn() + Send + Sync>,
    /// Signal IDs read during the last run.
    dependencies: RwLock<HashSet<u64>>,
    disposed: AtomicBool,
    running: AtomicBool,
    run_count: AtomicUsize,
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::trace!(effect = self.id, name = ?self.name, "skipping re-entrant run");
            return;
        }
        let _running = RunningGuard(&self.running);

        Runtime::clear_dependencies(self.subscriber_id);

        let new_deps: HashSet<u64> = {
            let _ctx = ReactiveContext::enter(self.subscriber_id);
            (self.run)();
            ReactiveContext::get_dependencies().into_iter().collect()
        };

        // A run that disposed its own effect must not leave edges behind.
        if self.disposed.load(Ordering::SeqCst) {
            Runtime::clear_dependencies(self.subscriber_id);
        }

        *self.dependencies.write() = new_deps;
        self.run_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Clears the running flag when a run ends, including by panic, so a failed
/// run does not block every later one.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn schedule(&self) {
        self.execute();
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let c = count.clone();
/// let effect = Effect::new(move || {
///     println!("Count is: {}", c.get());
/// });
///
/// count.set(5);  // Prints: "Count is: 5"
/// effect.dispose();
/// count.set(6);  // Prints nothing
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
    _handle: Arc<ReactiveHandle>,
}

impl Effect {
    /// Create a new effect and run it once.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create a named effect and run it once. The name shows up in logs.
    pub fn named<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::build(Some(name.into()), Arc::new(run));
        effect.execute();
        effect
    }

    /// Create a new effect without running it.
    ///
    /// A lazy effect has no dependencies until [`Effect::execute`] is called.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(None, Arc::new(run))
    }

    pub(crate) fn build(name: Option<String>, run: Arc<dyn Fn() + Send + Sync>) -> Self {
        let inner = Arc::new(EffectInner {
            id: next_effect_id(),
            subscriber_id: SubscriberId::new(),
            name,
            run,
            dependencies: RwLock::new(HashSet::new()),
            disposed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });
        let handle = Runtime::register(inner.clone());

        Self {
            inner,
            _handle: Arc::new(handle),
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The diagnostic name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Run the effect function inside a tracking context.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Schedule the effect to re-run.
    pub fn schedule(&self) {
        self.inner.schedule();
    }

    /// Stop the effect. Further changes never re-run it.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            Runtime::clear_dependencies(self.inner.subscriber_id);
            self.inner.dependencies.write().clear();
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of signals read on the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.read().len()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

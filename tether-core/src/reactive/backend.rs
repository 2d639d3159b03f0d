//! Backend seam between the binding layer and a reactive library.
//!
//! The binding layer only ever needs two capabilities from a reactive
//! library: start an auto-tracking computation ([`ReactiveBackend::observe`])
//! and run a mutation atomically ([`ReactiveBackend::run_atomically`]).
//! Selector/effect reactions are built on top of `observe` by
//! [`react_to_change`], so any backend gets them for free.
//!
//! [`SignalBackend`] is the implementation backed by this crate's
//! [`Signal`](super::Signal)/[`Effect`] runtime.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::context::ReactiveContext;
use super::disposer::Disposer;
use super::effect::Effect;
use super::runtime::Runtime;

/// Options passed through to [`ReactiveBackend::observe`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserveOptions {
    /// Diagnostic name of the computation.
    pub name: Option<String>,
    /// Warn when the first run reads no signal at all.
    pub requires_observable: bool,
}

impl ObserveOptions {
    /// Options with only a diagnostic name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Options for [`react_to_change`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionOptions {
    #[serde(flatten)]
    pub observe: ObserveOptions,
    /// Run the effect with the first selected value instead of waiting for
    /// the first change.
    pub fire_immediately: bool,
}

/// The capabilities the binding layer consumes from a reactive library.
pub trait ReactiveBackend: Send + Sync {
    /// Run `run` now and again whenever anything it read changes, until the
    /// returned disposer is called.
    ///
    /// Disposal is the only way to stop the computation: dropping every
    /// clone of the disposer leaves it running.
    fn observe(&self, run: Arc<dyn Fn() + Send + Sync>, options: &ObserveOptions) -> Disposer;

    /// Run `f` as a single atomic mutation.
    fn run_atomically(&self, f: &mut dyn FnMut());
}

/// Computations started by [`SignalBackend::observe`], kept alive until
/// their disposer runs.
static OBSERVED: OnceLock<Mutex<HashMap<u64, Effect>>> = OnceLock::new();

fn get_observed() -> &'static Mutex<HashMap<u64, Effect>> {
    OBSERVED.get_or_init(|| Mutex::new(HashMap::new()))
}

/// [`ReactiveBackend`] over this crate's signal runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalBackend;

impl ReactiveBackend for SignalBackend {
    fn observe(&self, run: Arc<dyn Fn() + Send + Sync>, options: &ObserveOptions) -> Disposer {
        let effect = Effect::build(options.name.clone(), run);
        let effect_id = effect.id();
        get_observed().lock().insert(effect_id, effect.clone());
        effect.execute();

        if options.requires_observable && effect.dependency_count() == 0 && !effect.is_disposed() {
            tracing::warn!(
                name = ?options.name,
                "computation read no observable on its first run"
            );
        }

        Disposer::new(move || {
            effect.dispose();
            get_observed().lock().remove(&effect_id);
        })
    }

    fn run_atomically(&self, f: &mut dyn FnMut()) {
        Runtime::run_atomically(f);
    }
}

/// Pair a tracked `selector` with an untracked `effect`.
///
/// The effect runs, inside an atomic batch, each time the selected value
/// differs from the previous one. On the very first evaluation it runs only
/// when `options.fire_immediately` is set.
pub fn react_to_change<V, S, E>(
    backend: &dyn ReactiveBackend,
    selector: S,
    effect: E,
    options: &ReactionOptions,
) -> Disposer
where
    V: Clone + PartialEq + Send + 'static,
    S: Fn() -> V + Send + Sync + 'static,
    E: Fn(V) + Send + Sync + 'static,
{
    let last: Mutex<Option<V>> = Mutex::new(None);
    let fire_immediately = options.fire_immediately;

    let run = Arc::new(move || {
        let value = selector();
        let fire = {
            let mut last = last.lock();
            let fire = match last.as_ref() {
                None => fire_immediately,
                Some(previous) => *previous != value,
            };
            *last = Some(value.clone());
            fire
        };

        if fire {
            ReactiveContext::untracked(|| Runtime::run_atomically(|| effect(value)));
        }
    });

    backend.observe(run, &options.observe)
}

/// [`react_to_change`] that fires immediately with the first value.
pub fn react<V, S, E>(backend: &dyn ReactiveBackend, selector: S, effect: E) -> Disposer
where
    V: Clone + PartialEq + Send + 'static,
    S: Fn() -> V + Send + Sync + 'static,
    E: Fn(V) + Send + Sync + 'static,
{
    let options = ReactionOptions {
        fire_immediately: true,
        ..ReactionOptions::default()
    };
    react_to_change(backend, selector, effect, &options)
}

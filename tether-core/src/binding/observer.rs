//! Lifecycle Binder
//!
//! An [`Observer`] attaches the reactive declarations of a [`ReactiveClass`]
//! to one instance and keeps them in step with the host's lifecycle hooks.
//!
//! # Binding state
//!
//! Construction sorts every resolved declaration into one of four key sets:
//! pending or retained, auto-run or reaction. Pending keys are bound into the
//! disable scope of the [`DisposerLedger`]; retained keys into the destroy
//! scope.
//!
//! # Activation
//!
//! - **First bind**: binds pending auto-runs, retained auto-runs, pending
//!   reactions, retained reactions, in that order, and records the caller.
//!   If the caller is [`BindCaller::Manual`] and
//!   [`BinderConfig::promote_on_manual_bind`] is set, pending auto-runs are
//!   moved to the retained set first: a manual bind before the host's enable
//!   hook has fired means the computation must survive later disable/enable
//!   cycles the host may not pair correctly.
//! - **Rebind**: binds only the pending sets. Retained subscriptions were
//!   never disposed on disable.
//!
//! Binding a key that is already live is a no-op.
//!
//! # Teardown
//!
//! Disable disposes the disable scope only; retained subscriptions keep
//! reacting while the instance is disabled. Destroy and forced finalization
//! dispose both scopes; running them twice disposes nothing the second time.
//! Dropping an observer disposes whatever is still live.

use std::sync::Arc;

use indexmap::IndexSet;

use super::class::{Method, ReactiveClass};
use super::declaration::{DeclarationKind, MethodKey};
use super::handle::Handle;
use super::ledger::{DisposerLedger, Scope};
use super::lifecycle::{BindCaller, BinderState, HostLifecycle};
use crate::config::BinderConfig;
use crate::error::BindError;
use crate::reactive::{ObserveOptions, ReactiveBackend, SignalBackend};

#[derive(Debug, Default)]
struct KeySets {
    pending_auto_run: IndexSet<MethodKey>,
    retained_auto_run: IndexSet<MethodKey>,
    pending_reaction: IndexSet<MethodKey>,
    retained_reaction: IndexSet<MethodKey>,
}

/// Binds a class's reactive declarations to one instance's lifecycle.
pub struct Observer<T: Send + Sync + 'static> {
    class: Arc<ReactiveClass<T>>,
    instance: Arc<T>,
    backend: Arc<dyn ReactiveBackend>,
    config: BinderConfig,
    state: BinderState,
    binding_token: Option<BindCaller>,
    keys: KeySets,
    ledger: DisposerLedger,
}

impl<T: Send + Sync + 'static> Observer<T> {
    /// Construct an observer over the crate's signal runtime.
    pub fn new(class: Arc<ReactiveClass<T>>, instance: T) -> Self {
        Self::with_backend(
            class,
            Arc::new(instance),
            Arc::new(SignalBackend),
            BinderConfig::default(),
        )
    }

    /// Construct an observer with an explicit backend and configuration.
    pub fn with_backend(
        class: Arc<ReactiveClass<T>>,
        instance: Arc<T>,
        backend: Arc<dyn ReactiveBackend>,
        config: BinderConfig,
    ) -> Self {
        let mut keys = KeySets::default();
        for declaration in class.declarations() {
            let set = match (declaration.kind, declaration.is_retained()) {
                (DeclarationKind::AutoRun, false) => &mut keys.pending_auto_run,
                (DeclarationKind::AutoRun, true) => &mut keys.retained_auto_run,
                (DeclarationKind::Reaction { .. }, false) => &mut keys.pending_reaction,
                (DeclarationKind::Reaction { .. }, true) => &mut keys.retained_reaction,
            };
            set.insert(declaration.key);
        }

        tracing::trace!(
            class = class.name(),
            pending_auto_run = keys.pending_auto_run.len(),
            retained_auto_run = keys.retained_auto_run.len(),
            pending_reaction = keys.pending_reaction.len(),
            retained_reaction = keys.retained_reaction.len(),
            "observer constructed"
        );

        Self {
            class,
            instance,
            backend,
            config,
            state: BinderState::Unbound,
            binding_token: None,
            keys,
            ledger: DisposerLedger::new(),
        }
    }

    pub fn class(&self) -> &Arc<ReactiveClass<T>> {
        &self.class
    }

    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    pub fn state(&self) -> BinderState {
        self.state
    }

    /// The caller of the first bind, until full teardown clears it.
    pub fn binding_token(&self) -> Option<BindCaller> {
        self.binding_token
    }

    pub fn ledger(&self) -> &DisposerLedger {
        &self.ledger
    }

    pub fn is_live(&self, key: impl Into<MethodKey>) -> bool {
        self.ledger.is_live(key.into())
    }

    pub fn pending_auto_runs(&self) -> impl Iterator<Item = MethodKey> + '_ {
        self.keys.pending_auto_run.iter().copied()
    }

    pub fn retained_auto_runs(&self) -> impl Iterator<Item = MethodKey> + '_ {
        self.keys.retained_auto_run.iter().copied()
    }

    pub fn pending_reactions(&self) -> impl Iterator<Item = MethodKey> + '_ {
        self.keys.pending_reaction.iter().copied()
    }

    pub fn retained_reactions(&self) -> impl Iterator<Item = MethodKey> + '_ {
        self.keys.retained_reaction.iter().copied()
    }

    /// Bind from user code, outside the host's enable hook.
    ///
    /// Use this when the enable hook is known not to fire, e.g. for an
    /// instance created deactivated.
    pub fn bind_manually(&mut self) -> Result<(), BindError> {
        self.bind(BindCaller::Manual)
    }

    /// Activate the declarations for `caller`.
    pub fn bind(&mut self, caller: BindCaller) -> Result<(), BindError> {
        if self.state.is_destroyed() {
            return Err(BindError::Destroyed {
                class: self.class.name().to_owned(),
            });
        }

        let span = tracing::debug_span!("bind", class = self.class.name(), ?caller);
        let _enter = span.enter();

        if self.binding_token.is_some() {
            let pending: Vec<_> = self
                .keys
                .pending_auto_run
                .iter()
                .chain(&self.keys.pending_reaction)
                .copied()
                .collect();
            self.bind_keys(&pending);
        } else {
            if caller == BindCaller::Manual && self.config.promote_on_manual_bind {
                self.promote_pending_auto_runs();
            }

            let KeySets {
                pending_auto_run,
                retained_auto_run,
                pending_reaction,
                retained_reaction,
            } = &self.keys;
            let ordered: Vec<_> = pending_auto_run
                .iter()
                .chain(retained_auto_run)
                .chain(pending_reaction)
                .chain(retained_reaction)
                .copied()
                .collect();
            self.bind_keys(&ordered);
            self.binding_token = Some(caller);
        }

        self.state = BinderState::Bound;
        tracing::debug!(
            disable_scoped = ?self.ledger.keys(Scope::Disable),
            destroy_scoped = ?self.ledger.keys(Scope::Destroy),
            "bound"
        );
        Ok(())
    }

    fn promote_pending_auto_runs(&mut self) {
        let promoted = std::mem::take(&mut self.keys.pending_auto_run);
        if !promoted.is_empty() {
            tracing::debug!(count = promoted.len(), "promoting auto-runs to retained");
        }
        self.keys.retained_auto_run.extend(promoted);
    }

    fn is_retained(&self, key: MethodKey) -> bool {
        self.keys.retained_auto_run.contains(&key) || self.keys.retained_reaction.contains(&key)
    }

    fn bind_keys(&mut self, keys: &[MethodKey]) {
        for &key in keys {
            self.bind_key(key);
        }
    }

    fn bind_key(&mut self, key: MethodKey) {
        if self.ledger.is_live(key) {
            tracing::trace!(%key, "already live");
            return;
        }
        let scope = Scope::for_retention(self.is_retained(key));

        let class = Arc::clone(&self.class);
        let Some(resolved) = class.get(key) else {
            return;
        };

        let handle = Handle::from_weak(Arc::downgrade(&self.instance));
        let disposer = match &resolved.method {
            Method::AutoRun(method) => {
                let method = Arc::clone(method);
                let options = ObserveOptions {
                    name: Some(
                        resolved
                            .declaration
                            .options
                            .observe
                            .name
                            .clone()
                            .unwrap_or_else(|| format!("{}.{}", class.name(), key)),
                    ),
                    ..resolved.declaration.options.observe.clone()
                };
                self.backend.observe(
                    Arc::new(move || {
                        handle.with(|instance| method(instance));
                    }),
                    &options,
                )
            }
            Method::Reactor(method) => method(&handle, self.backend.as_ref()),
        };

        self.ledger.insert(scope, key, disposer);
        tracing::trace!(%key, ?scope, "declaration bound");
    }

    /// Dispose disable-scoped subscriptions.
    fn partial_teardown(&mut self) -> usize {
        self.ledger.dispose_scope(Scope::Disable)
    }

    /// Dispose everything. Safe to repeat.
    fn full_teardown(&mut self) -> usize {
        let disposed = self.ledger.dispose_all();
        self.binding_token = None;
        self.state = BinderState::Destroyed;
        disposed
    }

    /// Full teardown followed by the host's own finalizer, which runs inside
    /// `run_atomically` so the state it clears is never an unguarded write.
    pub fn finalize_with(&mut self, finalize: impl FnOnce(&T)) {
        let disposed = self.full_teardown();
        tracing::debug!(class = self.class.name(), disposed, "force finalized");

        let instance = Arc::clone(&self.instance);
        let mut finalize = Some(finalize);
        self.backend.run_atomically(&mut || {
            if let Some(finalize) = finalize.take() {
                finalize(&instance);
            }
        });
    }
}

impl<T: Send + Sync + 'static> HostLifecycle for Observer<T> {
    fn on_enable(&mut self) {
        if let Err(err) = self.bind(BindCaller::EnableHook) {
            tracing::warn!(%err, "enable ignored");
        }
    }

    fn on_disable(&mut self) {
        if self.state.is_destroyed() {
            tracing::warn!(class = self.class.name(), "disable after destroy ignored");
            return;
        }

        let disposed = self.partial_teardown();
        if self.state == BinderState::Bound {
            self.state = BinderState::Disabled;
        }
        tracing::debug!(class = self.class.name(), disposed, "disabled");
    }

    fn on_destroy(&mut self) {
        if self.state.is_destroyed() {
            tracing::warn!(class = self.class.name(), "destroy after destroy ignored");
            return;
        }

        let disposed = self.full_teardown();
        tracing::debug!(class = self.class.name(), disposed, "destroyed");
    }

    fn on_force_finalize(&mut self) {
        self.finalize_with(|_| {});
    }
}

impl<T: Send + Sync + 'static> Drop for Observer<T> {
    fn drop(&mut self) {
        let disposed = self.ledger.dispose_all();
        if disposed > 0 {
            tracing::debug!(class = self.class.name(), disposed, "observer dropped while bound");
        }
    }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("class", &self.class.name())
            .field("state", &self.state)
            .field("binding_token", &self.binding_token)
            .field("keys", &self.keys)
            .field("ledger", &self.ledger)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::DeclarationOptions;
    use crate::reactive::Disposer;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that runs nothing reactively and counts disposals.
    #[derive(Default)]
    struct CountingBackend {
        observed: AtomicUsize,
        disposed: Arc<AtomicUsize>,
        atomic_runs: AtomicUsize,
        names: Mutex<Vec<String>>,
    }

    impl ReactiveBackend for CountingBackend {
        fn observe(&self, run: Arc<dyn Fn() + Send + Sync>, options: &ObserveOptions) -> Disposer {
            run();
            self.observed.fetch_add(1, Ordering::SeqCst);
            self.names.lock().extend(options.name.clone());
            let disposed = Arc::clone(&self.disposed);
            Disposer::new(move || {
                disposed.fetch_add(1, Ordering::SeqCst);
            })
        }

        fn run_atomically(&self, f: &mut dyn FnMut()) {
            self.atomic_runs.fetch_add(1, Ordering::SeqCst);
            f();
        }
    }

    struct Panel {
        renders: AtomicUsize,
    }

    fn panel_class(render_options: DeclarationOptions) -> Arc<ReactiveClass<Panel>> {
        ReactiveClass::builder("Panel")
            .auto_run_with("render", render_options, |p: &Panel| {
                p.renders.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap()
    }

    fn observer(
        class: Arc<ReactiveClass<Panel>>,
        config: BinderConfig,
    ) -> (Observer<Panel>, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend::default());
        let observer = Observer::with_backend(
            class,
            Arc::new(Panel {
                renders: AtomicUsize::new(0),
            }),
            backend.clone(),
            config,
        );
        (observer, backend)
    }

    fn default_observer(options: DeclarationOptions) -> (Observer<Panel>, Arc<CountingBackend>) {
        observer(panel_class(options), BinderConfig::default())
    }

    #[test]
    fn double_bind_keeps_one_disposer() {
        let (mut obs, backend) = default_observer(DeclarationOptions::default());

        obs.on_enable();
        obs.on_enable();

        assert_eq!(backend.observed.load(Ordering::SeqCst), 1);
        assert_eq!(obs.ledger().len(Scope::Disable), 1);
        assert_eq!(obs.instance().renders.load(Ordering::SeqCst), 1);
        assert_eq!(obs.state(), BinderState::Bound);
        assert_eq!(obs.binding_token(), Some(BindCaller::EnableHook));
    }

    #[test]
    fn default_name_is_class_dot_key() {
        let (mut obs, backend) = default_observer(DeclarationOptions::default());
        obs.on_enable();
        assert_eq!(*backend.names.lock(), vec!["Panel.render".to_owned()]);

        let (mut obs, backend) = observer(
            panel_class(DeclarationOptions::default().name("custom")),
            BinderConfig::default(),
        );
        obs.on_enable();
        assert_eq!(*backend.names.lock(), vec!["custom".to_owned()]);
    }

    #[test]
    fn disable_then_enable_rebinds_pending() {
        let (mut obs, backend) = default_observer(DeclarationOptions::default());

        obs.on_enable();
        obs.on_disable();
        assert_eq!(obs.state(), BinderState::Disabled);
        assert_eq!(backend.disposed.load(Ordering::SeqCst), 1);
        assert!(!obs.is_live("render"));

        obs.on_enable();
        assert!(obs.is_live("render"));
        assert_eq!(backend.observed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn manual_first_bind_promotes_unless_disabled_by_config() {
        let (mut promoted, _) = default_observer(DeclarationOptions::default());
        promoted.bind_manually().unwrap();
        assert_eq!(promoted.pending_auto_runs().count(), 0);
        assert_eq!(
            promoted.retained_auto_runs().collect::<Vec<_>>(),
            vec![MethodKey::from("render")]
        );
        assert_eq!(promoted.ledger().scope_of(MethodKey::from("render")), Some(Scope::Destroy));

        let config = BinderConfig {
            promote_on_manual_bind: false,
        };
        let (mut plain, _) = observer(panel_class(DeclarationOptions::default()), config);
        plain.bind_manually().unwrap();
        assert_eq!(plain.ledger().scope_of(MethodKey::from("render")), Some(Scope::Disable));
        assert_eq!(plain.binding_token(), Some(BindCaller::Manual));
    }

    #[test]
    fn bind_after_destroy_is_rejected() {
        let (mut obs, backend) = default_observer(DeclarationOptions::default());
        obs.on_enable();
        obs.on_destroy();

        assert!(matches!(obs.bind_manually(), Err(BindError::Destroyed { .. })));
        obs.on_enable();
        obs.on_disable();
        assert_eq!(backend.observed.load(Ordering::SeqCst), 1);
        assert_eq!(obs.state(), BinderState::Destroyed);
        assert_eq!(obs.binding_token(), None);
    }

    #[test]
    fn finalizer_runs_atomically_after_teardown() {
        let (mut obs, backend) = default_observer(DeclarationOptions::retained());
        obs.on_enable();

        let live_during_finalize = Arc::new(Mutex::new(None));
        let seen = live_during_finalize.clone();
        let ledger_empty = obs.ledger().is_empty();
        assert!(!ledger_empty);

        obs.finalize_with(move |panel| {
            *seen.lock() = Some(panel.renders.load(Ordering::SeqCst));
        });

        assert_eq!(backend.atomic_runs.load(Ordering::SeqCst), 1);
        assert_eq!(backend.disposed.load(Ordering::SeqCst), 1);
        assert_eq!(*live_during_finalize.lock(), Some(1));
        assert!(obs.ledger().is_empty());
    }
}

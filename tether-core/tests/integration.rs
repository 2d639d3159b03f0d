//! Integration Tests for the Reactive Runtime
//!
//! These tests verify that signals, effects, atomic batches and reactions
//! work together through the runtime.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tether_core::reactive::{
    react, react_to_change, Effect, ObserveOptions, ReactionOptions, ReactiveBackend,
    ReactiveContext, Runtime, Signal, SignalBackend, SubscriberId,
};

/// Test that an effect re-runs when a signal it read changes.
#[test]
fn effect_reruns_on_signal_change() {
    let signal = Signal::new(0);
    let observed = Arc::new(AtomicI32::new(-1));

    let (s, o) = (signal.clone(), observed.clone());
    let effect = Effect::new(move || o.store(s.get(), Ordering::SeqCst));
    assert_eq!(observed.load(Ordering::SeqCst), 0);

    signal.set(42);
    assert_eq!(observed.load(Ordering::SeqCst), 42);
    assert_eq!(effect.run_count(), 2);
}

/// Test effect disposal stops execution.
#[test]
fn disposed_effect_does_not_run() {
    let signal = Signal::new(0);
    let runs = Arc::new(AtomicUsize::new(0));

    let (s, r) = (signal.clone(), runs.clone());
    let effect = Effect::new(move || {
        s.get();
        r.fetch_add(1, Ordering::SeqCst);
    });

    effect.dispose();
    signal.set(1);
    effect.schedule();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(signal.subscriber_count(), 0);
}

/// Test that writes inside one atomic batch are seen as one change.
#[test]
fn atomic_batch_delivers_once() {
    let a = Signal::new(1);
    let b = Signal::new(2);
    let sums = Arc::new(Mutex::new(Vec::new()));

    let (ac, bc, sc) = (a.clone(), b.clone(), sums.clone());
    let _effect = Effect::new(move || sc.lock().push(ac.get() + bc.get()));

    Runtime::run_atomically(|| {
        a.set(10);
        b.set(20);
        assert!(Runtime::in_action());
    });

    assert!(!Runtime::in_action());
    assert_eq!(*sums.lock(), vec![3, 30]);
}

/// Test that the effect of a reaction does not subscribe to what it reads.
#[test]
fn reaction_effect_is_untracked() {
    let source = Signal::new(1);
    let other = Signal::new(100);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let (src, oth, sn) = (source.clone(), other.clone(), seen.clone());
    let disposer = react(
        &SignalBackend,
        move || src.get(),
        move |value| sn.lock().push(value + oth.get()),
    );

    assert_eq!(*seen.lock(), vec![101]);

    // Only the selector is tracked.
    other.set(200);
    assert_eq!(*seen.lock(), vec![101]);

    source.set(2);
    assert_eq!(*seen.lock(), vec![101, 202]);

    disposer.dispose();
    source.set(3);
    assert_eq!(seen.lock().len(), 2);
}

/// Test that a reaction fires only when the selected value changes.
#[test]
fn reaction_skips_equal_values() {
    let count = Signal::new(3);
    let fired = Arc::new(Mutex::new(Vec::new()));

    let (c, f) = (count.clone(), fired.clone());
    let disposer = react_to_change(
        &SignalBackend,
        move || c.get() % 2 == 0,
        move |even| f.lock().push(even),
        &ReactionOptions::default(),
    );

    // Not fired immediately.
    assert!(fired.lock().is_empty());

    count.set(5);
    assert!(fired.lock().is_empty());

    count.set(6);
    count.set(8);
    count.set(9);
    assert_eq!(*fired.lock(), vec![true, false]);
    disposer.dispose();
}

/// Test that a backend computation keeps running until its disposer fires.
#[test]
fn observe_lives_until_disposed() {
    let signal = Signal::new(0);
    let runs = Arc::new(AtomicUsize::new(0));

    let (s, r) = (signal.clone(), runs.clone());
    let disposer = SignalBackend.observe(
        Arc::new(move || {
            s.get();
            r.fetch_add(1, Ordering::SeqCst);
        }),
        &ObserveOptions::named("counter"),
    );

    signal.set(1);
    signal.set(2);
    assert_eq!(runs.load(Ordering::SeqCst), 3);

    disposer.dispose();
    disposer.dispose();
    signal.set(3);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert!(disposer.is_disposed());
}

/// Test that ReactiveContext correctly tracks nested computations.
#[test]
fn nested_reactive_contexts() {
    let outer_id = SubscriberId::new();
    let inner_id = SubscriberId::new();

    let _outer_ctx = ReactiveContext::enter(outer_id);
    ReactiveContext::track_dependency(1);
    ReactiveContext::track_dependency(2);

    {
        let _inner_ctx = ReactiveContext::enter(inner_id);
        ReactiveContext::track_dependency(3);

        let inner_deps = ReactiveContext::get_dependencies();
        assert_eq!(inner_deps, vec![3]);

        // Untracked reads record nothing for the inner computation.
        ReactiveContext::untracked(|| ReactiveContext::track_dependency(4));
        assert_eq!(ReactiveContext::get_dependencies(), vec![3]);
    }

    let outer_deps = ReactiveContext::get_dependencies();
    assert_eq!(outer_deps.len(), 2);
    assert!(outer_deps.contains(&1));
    assert!(outer_deps.contains(&2));
}

//! Reactive Context
//!
//! The reactive context tracks which computation is currently running so
//! that signal reads can be attributed to it.
//!
//! # Implementation
//!
//! A thread-local stack holds one entry per running computation. Entering a
//! computation pushes its subscriber; the returned guard pops it on drop, so
//! the stack stays balanced even if the computation panics.
//!
//! An entry may also be *untracked*: [`ReactiveContext::untracked`] pushes a
//! frame with no subscriber, which hides any enclosing computation. Reaction
//! effects run inside such a frame so the signals they read do not become
//! dependencies of the reaction.

use std::cell::RefCell;

use super::SubscriberId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = RefCell::new(Vec::new());
}

#[derive(Debug, Clone)]
struct ContextEntry {
    /// `None` for an untracked frame.
    subscriber_id: Option<SubscriberId>,
    /// Signal ids read while this frame was on top.
    dependencies: Vec<u64>,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a tracking context for the given subscriber.
    ///
    /// While the returned guard is alive, signal reads register `subscriber_id`
    /// as a dependent.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        Self::push(Some(subscriber_id))
    }

    fn push(subscriber_id: Option<SubscriberId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber_id,
                dependencies: Vec::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Run `f` with dependency tracking suspended.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let _ctx = Self::push(None);
        f()
    }

    /// Check if a tracking context is active on this thread.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// The subscriber on top of the stack, if it is tracking.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.subscriber_id))
    }

    /// Record a read of `signal_id` against the current computation.
    pub fn track_dependency(signal_id: u64) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if entry.subscriber_id.is_some() && !entry.dependencies.contains(&signal_id) {
                    entry.dependencies.push(signal_id);
                }
            }
        });
    }

    /// Signal ids read so far by the computation on top of the stack.
    pub fn get_dependencies() -> Vec<u64> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.clone())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

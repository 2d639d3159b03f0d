//! Weak instance handles.
//!
//! Live subscriptions must not keep a destroyed instance alive, so the binder
//! never gives a computation an `Arc<T>`. It gives it a [`Handle<T>`]: a weak
//! reference that can be *projected* onto an embedded base object, which is
//! how methods declared on a parent class reach their part of a derived
//! instance.

use std::sync::{Arc, Weak};

type Access<T> = Arc<dyn Fn(&mut dyn FnMut(&T)) -> bool + Send + Sync>;

/// Projection from a derived instance onto its embedded base.
pub type Lens<C, P> = Arc<dyn Fn(&C) -> &P + Send + Sync>;

/// Box a projection closure as a [`Lens`].
///
/// Going through this function gives the closure the signature
/// `for<'a> Fn(&'a C) -> &'a P`, which a bare `Arc::new(|c: &C| &c.base)`
/// cannot infer.
pub fn lens<C, P, F>(f: F) -> Lens<C, P>
where
    F: Fn(&C) -> &P + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A weak, projectable reference to a bound instance.
pub struct Handle<T> {
    access: Access<T>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            access: Arc::clone(&self.access),
        }
    }
}

impl<T: Send + Sync + 'static> Handle<T> {
    pub(crate) fn from_weak(weak: Weak<T>) -> Self {
        let access: Access<T> = Arc::new(move |f: &mut dyn FnMut(&T)| match weak.upgrade() {
            Some(instance) => {
                f(&instance);
                true
            }
            None => false,
        });
        Self { access }
    }
}

impl<T: 'static> Handle<T> {
    /// Run `f` against the instance, or return `None` if it is gone.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let mut f = Some(f);
        let mut out = None;
        (self.access)(&mut |instance: &T| {
            if let Some(f) = f.take() {
                out = Some(f(instance));
            }
        });
        out
    }

    /// Whether the instance still exists.
    pub fn is_alive(&self) -> bool {
        (self.access)(&mut |_: &T| {})
    }

    /// A handle to the part of the instance that `lens` selects.
    pub fn project<P: 'static>(&self, lens: Lens<T, P>) -> Handle<P> {
        let access = Arc::clone(&self.access);
        let projected: Access<P> = Arc::new(move |f: &mut dyn FnMut(&P)| {
            access(&mut |instance: &T| f(lens(instance)))
        });
        Handle { access: projected }
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").finish_non_exhaustive()
    }
}

//! Disposers
//!
//! A [`Disposer`] is the cleanup handle returned by every subscription
//! primitive. Calling it cancels the subscription. It can be called any number
//! of times; only the first call does anything.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type Cleanup = Box<dyn FnOnce() + Send>;

/// An idempotent, shareable cleanup handle.
///
/// Clones refer to the same subscription: disposing any clone disposes all of
/// them. Dropping a disposer does not dispose it; the subscription stays live
/// until [`Disposer::dispose`] is called.
#[derive(Clone)]
pub struct Disposer {
    cleanup: Arc<Mutex<Option<Cleanup>>>,
}

impl Disposer {
    /// Wrap a cleanup closure.
    pub fn new(cleanup: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cleanup: Arc::new(Mutex::new(Some(Box::new(cleanup)))),
        }
    }

    /// A disposer with nothing to clean up.
    pub fn noop() -> Self {
        Self {
            cleanup: Arc::new(Mutex::new(None)),
        }
    }

    /// Cancel the subscription. Repeated calls are no-ops.
    pub fn dispose(&self) {
        // Take first so the cleanup runs without the lock held.
        let cleanup = self.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    /// Whether the cleanup has already run.
    pub fn is_disposed(&self) -> bool {
        self.cleanup.lock().is_none()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispose_runs_cleanup_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let disposer = Disposer::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!disposer.is_disposed());
        disposer.dispose();
        disposer.dispose();

        assert!(disposer.is_disposed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_cleanup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let disposer = Disposer::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let copy = disposer.clone();

        copy.dispose();
        disposer.dispose();

        assert!(disposer.is_disposed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_does_not_dispose() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        drop(Disposer::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cleanup_may_dispose_itself() {
        let slot: Arc<Mutex<Option<Disposer>>> = Arc::new(Mutex::new(None));
        let inner = slot.clone();
        let disposer = Disposer::new(move || {
            if let Some(d) = inner.lock().take() {
                d.dispose();
            }
        });
        *slot.lock() = Some(disposer.clone());

        disposer.dispose();
        assert!(disposer.is_disposed());
        assert!(Disposer::noop().is_disposed());
    }
}

//! Disposer Ledger
//!
//! Per-instance bookkeeping of live subscriptions, split by when they must be
//! torn down. A key is live in at most one scope at a time, and at most once
//! within it: inserting a key that is already live disposes the newcomer.

use indexmap::IndexMap;

use super::declaration::MethodKey;
use crate::reactive::Disposer;

/// When a subscription is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// On every disable.
    Disable,
    /// Only on destroy or forced finalization.
    Destroy,
}

impl Scope {
    pub fn for_retention(retain: bool) -> Self {
        if retain {
            Scope::Destroy
        } else {
            Scope::Disable
        }
    }
}

#[derive(Debug, Default)]
pub struct DisposerLedger {
    at_disable: IndexMap<MethodKey, Disposer>,
    at_destroy: IndexMap<MethodKey, Disposer>,
}

impl DisposerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self, scope: Scope) -> &IndexMap<MethodKey, Disposer> {
        match scope {
            Scope::Disable => &self.at_disable,
            Scope::Destroy => &self.at_destroy,
        }
    }

    fn entries_mut(&mut self, scope: Scope) -> &mut IndexMap<MethodKey, Disposer> {
        match scope {
            Scope::Disable => &mut self.at_disable,
            Scope::Destroy => &mut self.at_destroy,
        }
    }

    /// The scope `key` is live in, if any.
    pub fn scope_of(&self, key: MethodKey) -> Option<Scope> {
        if self.at_disable.contains_key(&key) {
            Some(Scope::Disable)
        } else if self.at_destroy.contains_key(&key) {
            Some(Scope::Destroy)
        } else {
            None
        }
    }

    pub fn is_live(&self, key: MethodKey) -> bool {
        self.scope_of(key).is_some()
    }

    /// Record `disposer` for `key`. Returns `false`, after disposing the
    /// rejected disposer, when `key` is already live in either scope.
    pub fn insert(&mut self, scope: Scope, key: MethodKey, disposer: Disposer) -> bool {
        if self.is_live(key) {
            disposer.dispose();
            return false;
        }
        self.entries_mut(scope).insert(key, disposer);
        true
    }

    /// Dispose and forget every entry in `scope`. Returns how many fired.
    pub fn dispose_scope(&mut self, scope: Scope) -> usize {
        // Drained before firing: a second teardown finds nothing to dispose.
        let drained = std::mem::take(self.entries_mut(scope));
        let count = drained.len();
        for (_, disposer) in drained {
            disposer.dispose();
        }
        count
    }

    /// Dispose the disable scope, then the destroy scope.
    pub fn dispose_all(&mut self) -> usize {
        self.dispose_scope(Scope::Disable) + self.dispose_scope(Scope::Destroy)
    }

    pub fn len(&self, scope: Scope) -> usize {
        self.entries(scope).len()
    }

    pub fn is_empty(&self) -> bool {
        self.at_disable.is_empty() && self.at_destroy.is_empty()
    }

    /// Live keys in `scope`, in binding order.
    pub fn keys(&self, scope: Scope) -> Vec<MethodKey> {
        self.entries(scope).keys().copied().collect()
    }
}

//! Declaration records.
//!
//! A [`Declaration`] is the class-level description of one reactive method:
//! which class owns it, its method key, whether it is an auto-run or a
//! reaction, and its options. Declarations describe classes, not instances,
//! and are never mutated once registered.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::registry::ClassId;
use crate::reactive::ObserveOptions;

/// Name of a declared method, unique within one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey(&'static str);

impl MethodKey {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl From<&'static str> for MethodKey {
    fn from(name: &'static str) -> Self {
        Self(name)
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// What the binder does with a declared method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// Hand the method to `observe`; it re-runs whenever what it read changes.
    AutoRun,
    /// Call the method once; it registers its own reaction and returns the
    /// disposer. `selector` is set when the declaration supplied the selector
    /// and the method body is only the effect.
    Reaction { selector: bool },
}

impl DeclarationKind {
    pub fn is_auto_run(&self) -> bool {
        matches!(self, DeclarationKind::AutoRun)
    }
}

/// Per-declaration options: a retention flag plus reactive-library options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclarationOptions {
    /// Keep the subscription alive across disable; dispose it only when the
    /// instance is destroyed.
    pub retain: bool,
    /// Selector reactions only: run the effect with the first selected value.
    pub fire_immediately: bool,
    #[serde(flatten)]
    pub observe: ObserveOptions,
}

impl DeclarationOptions {
    /// Options for a declaration that survives disable.
    pub fn retained() -> Self {
        Self {
            retain: true,
            ..Self::default()
        }
    }

    pub fn retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    pub fn fire_immediately(mut self, fire: bool) -> Self {
        self.fire_immediately = fire;
        self
    }

    /// Override the default `Class.key` diagnostic name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.observe.name = Some(name.into());
        self
    }

    pub fn requires_observable(mut self, required: bool) -> Self {
        self.observe.requires_observable = required;
        self
    }
}

/// One reactive method declared on one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// The class whose body declared the method.
    pub owner: ClassId,
    pub key: MethodKey,
    pub kind: DeclarationKind,
    pub options: DeclarationOptions,
}

impl Declaration {
    pub fn is_retained(&self) -> bool {
        self.options.retain
    }
}

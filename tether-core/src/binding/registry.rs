//! Declaration Registry
//!
//! The process-wide table of reactive classes and the declarations their
//! bodies made. It is append-only: classes are defined and declarations are
//! registered at class-definition time, long before any instance exists, and
//! nothing is ever removed.
//!
//! Classes are addressed by a stable integer [`ClassId`] handed out by
//! [`Registry::define_class`]. Each class records its single parent, so the
//! registry can walk an inheritance chain from the most-derived class to the
//! root ([`Registry::chain`]) and flatten it with first-occurrence-wins
//! shadowing ([`Registry::resolve`]).

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::declaration::{Declaration, DeclarationKind, DeclarationOptions, MethodKey};
use crate::error::BindError;

/// Stable handle to a registered class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

struct ClassRecord {
    name: String,
    parent: Option<ClassId>,
    declarations: SmallVec<[Declaration; 4]>,
}

/// The global declaration registry.
pub struct Registry;

static CLASSES: OnceLock<RwLock<Vec<ClassRecord>>> = OnceLock::new();

fn get_classes() -> &'static RwLock<Vec<ClassRecord>> {
    CLASSES.get_or_init(|| RwLock::new(Vec::new()))
}

impl Registry {
    /// Define a new class, optionally extending an already defined parent.
    pub fn define_class(name: &str, parent: Option<ClassId>) -> Result<ClassId, BindError> {
        let mut classes = get_classes().write();

        if let Some(parent) = parent {
            if parent.0 as usize >= classes.len() {
                return Err(BindError::UnknownClass(parent));
            }
        }

        let id = ClassId(classes.len() as u32);
        classes.push(ClassRecord {
            name: name.to_owned(),
            parent,
            declarations: SmallVec::new(),
        });

        tracing::trace!(class = name, %id, parent = ?parent, "class defined");
        Ok(id)
    }

    /// Append a declaration to `class`.
    pub fn register(
        class: ClassId,
        key: MethodKey,
        kind: DeclarationKind,
        options: DeclarationOptions,
    ) -> Result<(), BindError> {
        let mut classes = get_classes().write();
        let record = classes
            .get_mut(class.0 as usize)
            .ok_or(BindError::UnknownClass(class))?;

        if record.declarations.iter().any(|d| d.key == key) {
            return Err(BindError::DuplicateDeclaration {
                class: record.name.clone(),
                key: key.to_string(),
            });
        }

        record.declarations.push(Declaration {
            owner: class,
            key,
            kind,
            options,
        });
        Ok(())
    }

    /// The declarations `class` itself made, in registration order. Empty for
    /// unknown classes.
    pub fn lookup(class: ClassId) -> Vec<Declaration> {
        get_classes()
            .read()
            .get(class.0 as usize)
            .map(|record| record.declarations.to_vec())
            .unwrap_or_default()
    }

    pub fn parent_of(class: ClassId) -> Option<ClassId> {
        get_classes()
            .read()
            .get(class.0 as usize)
            .and_then(|record| record.parent)
    }

    pub fn class_name(class: ClassId) -> Option<String> {
        get_classes()
            .read()
            .get(class.0 as usize)
            .map(|record| record.name.clone())
    }

    /// `class` followed by its ancestors, most-derived first.
    pub fn chain(class: ClassId) -> Vec<ClassId> {
        let classes = get_classes().read();
        let mut chain = Vec::new();
        let mut current = Some(class);

        while let Some(id) = current {
            let Some(record) = classes.get(id.0 as usize) else {
                break;
            };
            chain.push(id);
            current = record.parent;
        }
        chain
    }

    /// Every declaration visible on `class`, walking from the most-derived
    /// class to the root. The first declaration of a key wins, so a subclass
    /// shadows an ancestor's declaration of the same method.
    pub fn resolve(class: ClassId) -> Vec<Declaration> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for id in Self::chain(class) {
            for declaration in Self::lookup(id) {
                if seen.insert(declaration.key) {
                    resolved.push(declaration);
                }
            }
        }
        resolved
    }
}

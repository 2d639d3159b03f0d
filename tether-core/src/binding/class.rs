//! Declaration API
//!
//! A [`ReactiveClass`] is the static description of a type whose instances
//! get reactive methods bound to their lifecycle. It is written once per type,
//! the way a class body would be, with [`ReactiveClass::builder`]:
//!
//! ```rust,ignore
//! static LABEL: LazyLock<Arc<ReactiveClass<Label>>> = LazyLock::new(|| {
//!     ReactiveClass::builder("Label")
//!         .auto_run("render", |label: &Label| label.render())
//!         .reaction("on_count", |label: &Label| label.count.get(), |label, count| {
//!             label.log(count)
//!         })
//!         .build()
//!         .expect("Label declarations are valid")
//! });
//! ```
//!
//! # Families
//!
//! - **Auto-run**: [`auto_run`](ReactiveClassBuilder::auto_run) /
//!   [`auto_run_with`](ReactiveClassBuilder::auto_run_with). The method runs
//!   immediately and again whenever something it read changes.
//! - **Reaction**: [`reactor`](ReactiveClassBuilder::reactor) /
//!   [`reactor_with`](ReactiveClassBuilder::reactor_with) declare a method
//!   that registers its own reaction and returns the disposer;
//!   [`reaction`](ReactiveClassBuilder::reaction) /
//!   [`reaction_with`](ReactiveClassBuilder::reaction_with) take the selector
//!   at declaration time and use the method body as the effect.
//!
//! # Inheritance
//!
//! A derived type embeds its base and declares the relation with
//! [`extends`](ReactiveClassBuilder::extends), passing a projection from the
//! derived instance to the embedded base. The parent's resolved declarations
//! are inherited through that projection; a declaration in the derived class
//! with the same key shadows the inherited one. Resolution happens once, in
//! [`build`](ReactiveClassBuilder::build), and is cached on the class.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use super::declaration::{Declaration, DeclarationKind, DeclarationOptions, MethodKey};
use super::handle::{Handle, Lens};
use super::registry::{ClassId, Registry};
use crate::error::BindError;
use crate::reactive::{react_to_change, Disposer, ReactionOptions, ReactiveBackend};

/// Body of an auto-run method.
pub type AutoRunFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Body of a reaction method: registers a reaction, returns its disposer.
pub type ReactorFn<T> = Arc<dyn Fn(&Handle<T>, &dyn ReactiveBackend) -> Disposer + Send + Sync>;

/// A declared method, bound to an instance by the observer.
pub enum Method<T> {
    AutoRun(AutoRunFn<T>),
    Reactor(ReactorFn<T>),
}

impl<T> Clone for Method<T> {
    fn clone(&self) -> Self {
        match self {
            Method::AutoRun(f) => Method::AutoRun(Arc::clone(f)),
            Method::Reactor(f) => Method::Reactor(Arc::clone(f)),
        }
    }
}

impl<T: 'static> Method<T> {
    /// Lift a base-class method onto a derived type.
    fn project<C: 'static>(&self, lens: Lens<C, T>) -> Method<C> {
        match self {
            Method::AutoRun(f) => {
                let f = Arc::clone(f);
                Method::AutoRun(Arc::new(move |instance: &C| f(lens(instance))))
            }
            Method::Reactor(f) => {
                let f = Arc::clone(f);
                Method::Reactor(Arc::new(
                    move |handle: &Handle<C>, backend: &dyn ReactiveBackend| {
                        f(&handle.project(Arc::clone(&lens)), backend)
                    },
                ))
            }
        }
    }
}

/// A declaration paired with the method that implements it.
pub struct ResolvedDeclaration<T> {
    pub declaration: Declaration,
    pub method: Method<T>,
}

impl<T> Clone for ResolvedDeclaration<T> {
    fn clone(&self) -> Self {
        Self {
            declaration: self.declaration.clone(),
            method: self.method.clone(),
        }
    }
}

/// The reactive declarations of one type, resolved across its ancestors.
pub struct ReactiveClass<T> {
    id: ClassId,
    name: String,
    resolved: IndexMap<MethodKey, ResolvedDeclaration<T>>,
}

impl<T: Send + Sync + 'static> ReactiveClass<T> {
    pub fn builder(name: impl Into<String>) -> ReactiveClassBuilder<T> {
        ReactiveClassBuilder {
            name: name.into(),
            parent: None,
            own: IndexMap::new(),
            duplicate: None,
        }
    }
}

impl<T> ReactiveClass<T> {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved declaration for `key`.
    pub fn get(&self, key: MethodKey) -> Option<&ResolvedDeclaration<T>> {
        self.resolved.get(&key)
    }

    /// All resolved declarations, most-derived class first.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> + '_ {
        self.resolved.values().map(|r| &r.declaration)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

impl<T> std::fmt::Debug for ReactiveClass<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveClass")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("keys", &self.resolved.keys().collect::<Vec<_>>())
            .finish()
    }
}

struct OwnDeclaration<T> {
    kind: DeclarationKind,
    options: DeclarationOptions,
    method: Method<T>,
}

struct ParentLink<T> {
    id: ClassId,
    inherited: Vec<ResolvedDeclaration<T>>,
}

/// Collects the declarations of one class body.
pub struct ReactiveClassBuilder<T> {
    name: String,
    parent: Option<ParentLink<T>>,
    own: IndexMap<MethodKey, OwnDeclaration<T>>,
    duplicate: Option<MethodKey>,
}

impl<T: Send + Sync + 'static> ReactiveClassBuilder<T> {
    /// Inherit the declarations of `parent`, reached through `lens`.
    pub fn extends<P, F>(mut self, parent: &ReactiveClass<P>, lens: F) -> Self
    where
        P: 'static,
        F: Fn(&T) -> &P + Send + Sync + 'static,
    {
        let lens: Lens<T, P> = Arc::new(lens);
        let inherited = parent
            .resolved
            .values()
            .map(|r| ResolvedDeclaration {
                declaration: r.declaration.clone(),
                method: r.method.project(Arc::clone(&lens)),
            })
            .collect();

        self.parent = Some(ParentLink {
            id: parent.id,
            inherited,
        });
        self
    }

    /// Declare `method` under `key`. The kind follows from the method.
    pub fn declare(
        self,
        key: &'static str,
        method: Method<T>,
        options: DeclarationOptions,
    ) -> Self {
        let kind = match method {
            Method::AutoRun(_) => DeclarationKind::AutoRun,
            Method::Reactor(_) => DeclarationKind::Reaction { selector: false },
        };
        self.push(key, kind, method, options)
    }

    fn push(
        mut self,
        key: &'static str,
        kind: DeclarationKind,
        method: Method<T>,
        options: DeclarationOptions,
    ) -> Self {
        let key = MethodKey::from(key);
        if self.own.contains_key(&key) {
            self.duplicate.get_or_insert(key);
            return self;
        }
        self.own.insert(
            key,
            OwnDeclaration {
                kind,
                options,
                method,
            },
        );
        self
    }

    /// Declare an auto-run method with default options.
    pub fn auto_run<F>(self, key: &'static str, f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.auto_run_with(key, DeclarationOptions::default(), f)
    }

    pub fn auto_run_with<F>(self, key: &'static str, options: DeclarationOptions, f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.push(key, DeclarationKind::AutoRun, Method::AutoRun(Arc::new(f)), options)
    }

    /// Declare a method that registers its own reaction and returns the
    /// disposer. The observer calls it once per bind.
    pub fn reactor<F>(self, key: &'static str, f: F) -> Self
    where
        F: Fn(&Handle<T>, &dyn ReactiveBackend) -> Disposer + Send + Sync + 'static,
    {
        self.reactor_with(key, DeclarationOptions::default(), f)
    }

    pub fn reactor_with<F>(self, key: &'static str, options: DeclarationOptions, f: F) -> Self
    where
        F: Fn(&Handle<T>, &dyn ReactiveBackend) -> Disposer + Send + Sync + 'static,
    {
        self.push(
            key,
            DeclarationKind::Reaction { selector: false },
            Method::Reactor(Arc::new(f)),
            options,
        )
    }

    /// Declare a reaction whose selector is given here and whose body is the
    /// effect, run with each newly selected value.
    pub fn reaction<V, S, E>(self, key: &'static str, selector: S, effect: E) -> Self
    where
        V: Clone + PartialEq + Send + 'static,
        S: Fn(&T) -> V + Send + Sync + 'static,
        E: Fn(&T, V) + Send + Sync + 'static,
    {
        self.reaction_with(key, DeclarationOptions::default(), selector, effect)
    }

    pub fn reaction_with<V, S, E>(
        self,
        key: &'static str,
        options: DeclarationOptions,
        selector: S,
        effect: E,
    ) -> Self
    where
        V: Clone + PartialEq + Send + 'static,
        S: Fn(&T) -> V + Send + Sync + 'static,
        E: Fn(&T, V) + Send + Sync + 'static,
    {
        let reaction_options = ReactionOptions {
            observe: crate::reactive::ObserveOptions {
                name: Some(
                    options
                        .observe
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("{}.{}", self.name, key)),
                ),
                ..options.observe.clone()
            },
            fire_immediately: options.fire_immediately,
        };
        let selector = Arc::new(selector);
        let effect = Arc::new(effect);

        let method = Method::Reactor(Arc::new(
            move |handle: &Handle<T>, backend: &dyn ReactiveBackend| {
                let (select_from, apply_to) = (handle.clone(), handle.clone());
                let selector = Arc::clone(&selector);
                let effect = Arc::clone(&effect);
                react_to_change(
                    backend,
                    move || select_from.with(|instance| selector(instance)),
                    move |value: Option<V>| {
                        if let Some(value) = value {
                            apply_to.with(|instance| effect(instance, value));
                        }
                    },
                    &reaction_options,
                )
            },
        ));

        self.push(key, DeclarationKind::Reaction { selector: true }, method, options)
    }

    /// Register the class and resolve its declarations.
    pub fn build(self) -> Result<Arc<ReactiveClass<T>>, BindError> {
        if let Some(key) = self.duplicate {
            return Err(BindError::DuplicateDeclaration {
                class: self.name,
                key: key.to_string(),
            });
        }

        let parent_id = self.parent.as_ref().map(|p| p.id);
        let id = Registry::define_class(&self.name, parent_id)?;

        let mut methods: HashMap<(ClassId, MethodKey), Method<T>> = HashMap::new();
        for (key, own) in self.own {
            Registry::register(id, key, own.kind, own.options)?;
            methods.insert((id, key), own.method);
        }
        if let Some(parent) = self.parent {
            for inherited in parent.inherited {
                let slot = (inherited.declaration.owner, inherited.declaration.key);
                methods.insert(slot, inherited.method);
            }
        }

        let mut resolved = IndexMap::new();
        for declaration in Registry::resolve(id) {
            if let Some(method) = methods.remove(&(declaration.owner, declaration.key)) {
                resolved.insert(declaration.key, ResolvedDeclaration { declaration, method });
            }
        }

        tracing::debug!(
            class = %self.name,
            %id,
            parent = ?parent_id,
            declarations = resolved.len(),
            "reactive class defined"
        );

        Ok(Arc::new(ReactiveClass {
            id,
            name: self.name,
            resolved,
        }))
    }
}

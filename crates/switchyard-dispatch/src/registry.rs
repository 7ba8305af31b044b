//! Name-to-handler registry.
//!
//! A [`Registry`] owns uniquely named handlers. Registering a name that is
//! already taken is an error, and so is removing a name that is not there:
//! the registry never silently overwrites or ignores.
//!
//! ```rust
//! use switchyard_dispatch::{Args, Registry, RegistryError};
//!
//! let mut registry = Registry::new();
//! registry.register_fn("add", |a: &Args| {
//!     Ok::<_, anyhow::Error>(a.get::<i64>(0)? + a.get::<i64>(1)?)
//! })?;
//!
//! assert!(registry.contains("add"));
//! assert!(matches!(
//!     registry.register_fn("add", |_: &Args| Ok::<_, anyhow::Error>(0)),
//!     Err(RegistryError::DuplicateName(_))
//! ));
//! # Ok::<(), RegistryError>(())
//! ```
//!
//! Groups register several handlers under a common prefix:
//!
//! ```rust
//! use switchyard_dispatch::{Args, Registry, SimpleFnHandler};
//!
//! let mut registry = Registry::new();
//! registry.group("text", |g| g
//!     .handler("upper", SimpleFnHandler::new(|a: &Args| {
//!         Ok::<_, anyhow::Error>(a.get::<String>(0)?.to_uppercase())
//!     }))
//!     .group("case", |g| g
//!         .handler("lower", SimpleFnHandler::new(|a: &Args| {
//!             Ok::<_, anyhow::Error>(a.get::<String>(0)?.to_lowercase())
//!         }))))?;
//!
//! assert_eq!(registry.list_names(), vec!["text.case.lower", "text.upper"]);
//! # Ok::<(), switchyard_dispatch::RegistryError>(())
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::handler::{Args, Arity, Handler, IntoHandlerResult, SimpleFnHandler};
use crate::names::{join_name, validate_name};

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A handler is already registered under this name.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// No handler is registered under this name.
    #[error("no handler registered under '{0}'")]
    NotFound(String),

    /// The name is malformed.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
}

/// Resolves names to handlers.
///
/// This is the seam the [`Dispatcher`](crate::Dispatcher) looks names up
/// through, implemented by both [`Registry`] and [`SharedRegistry`].
pub trait Lookup {
    /// Returns the handler registered under `name`, if any.
    fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>>;
}

/// Description of a registered handler, as reported by [`Registry::describe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    /// The registered name
    pub name: String,
    /// The handler's one-line description, if it has one
    pub description: Option<String>,
    /// The argument counts the handler accepts
    pub arity: Arity,
}

/// A mapping from unique names to handlers.
///
/// Names are kept sorted, so [`list_names`](Registry::list_names) returns
/// them in lexicographic order.
#[derive(Default, Clone)]
pub struct Registry {
    handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`.
    ///
    /// Fails with [`RegistryError::DuplicateName`] if the name is taken (the
    /// existing handler stays in place) and with
    /// [`RegistryError::InvalidName`] if the name is malformed.
    pub fn register<H>(&mut self, name: &str, handler: H) -> Result<(), RegistryError>
    where
        H: Handler + 'static,
    {
        self.register_arc(name, Arc::new(handler))
    }

    /// Registers an already shared handler under `name`.
    ///
    /// The same handler may be registered under several names.
    pub fn register_arc(
        &mut self,
        name: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RegistryError> {
        validate_name(name)?;
        if self.handlers.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }

        debug!(name, "registered handler");
        self.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    /// Registers a closure that only needs the call arguments.
    pub fn register_fn<F, R>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(&Args) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.register(name, SimpleFnHandler::new(f))
    }

    /// Registers every handler of a group under `prefix`.
    ///
    /// Registration is all-or-nothing: if any resulting name is malformed,
    /// already registered, or repeated inside the group, nothing is inserted.
    pub fn group<F>(&mut self, prefix: &str, configure: F) -> Result<&mut Self, RegistryError>
    where
        F: FnOnce(GroupBuilder) -> GroupBuilder,
    {
        validate_name(prefix)?;

        let mut flat = Vec::new();
        configure(GroupBuilder::new()).flatten_into(prefix, &mut flat);

        let mut seen = HashSet::new();
        for (name, _) in &flat {
            validate_name(name)?;
            if self.handlers.contains_key(name) || !seen.insert(name.as_str()) {
                return Err(RegistryError::DuplicateName(name.clone()));
            }
        }

        debug!(prefix, count = flat.len(), "registered group");
        self.handlers.extend(flat);
        Ok(self)
    }

    /// Returns the handler registered under `name`.
    ///
    /// The returned handler is the same allocation that was registered.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Handler>, RegistryError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Removes and returns the handler registered under `name`.
    ///
    /// Fails with [`RegistryError::NotFound`] if the name is absent.
    pub fn remove(&mut self, name: &str) -> Result<Arc<dyn Handler>, RegistryError> {
        let handler = self
            .handlers
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        debug!(name, "removed handler");
        Ok(handler)
    }

    /// Returns a snapshot of the registered names in lexicographic order.
    pub fn list_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Describes the handler registered under `name`.
    pub fn describe(&self, name: &str) -> Result<HandlerInfo, RegistryError> {
        let handler = self.get(name)?;
        Ok(HandlerInfo {
            name: name.to_string(),
            description: handler.description().map(String::from),
            arity: handler.arity(),
        })
    }

    /// Returns true if a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Lookup for Registry {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

enum GroupEntry {
    Handler(Arc<dyn Handler>),
    Group(GroupBuilder),
}

/// Collects handlers to register under a common prefix.
///
/// Built through [`Registry::group`]; groups can nest.
#[derive(Default)]
pub struct GroupBuilder {
    entries: Vec<(String, GroupEntry)>,
}

impl GroupBuilder {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler under `name` within this group.
    pub fn handler<H>(mut self, name: &str, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.entries
            .push((name.to_string(), GroupEntry::Handler(Arc::new(handler))));
        self
    }

    /// Adds a nested group under `name` within this group.
    pub fn group<F>(mut self, name: &str, configure: F) -> Self
    where
        F: FnOnce(GroupBuilder) -> GroupBuilder,
    {
        let nested = configure(GroupBuilder::new());
        self.entries
            .push((name.to_string(), GroupEntry::Group(nested)));
        self
    }

    /// Returns true if the group has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flatten_into(self, prefix: &str, out: &mut Vec<(String, Arc<dyn Handler>)>) {
        for (name, entry) in self.entries {
            let path = join_name(prefix, &name);
            match entry {
                GroupEntry::Handler(handler) => out.push((path, handler)),
                GroupEntry::Group(nested) => nested.flatten_into(&path, out),
            }
        }
    }
}

/// A cloneable, thread-safe registry.
///
/// Mutations (`register`, `remove`) are serialized behind a write lock;
/// lookups and listings take a read lock and may run concurrently. Clones
/// share the same underlying registry.
#[derive(Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl SharedRegistry {
    /// Creates an empty shared registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`. See [`Registry::register`].
    pub fn register<H>(&self, name: &str, handler: H) -> Result<(), RegistryError>
    where
        H: Handler + 'static,
    {
        self.inner.write().register(name, handler)
    }

    /// Registers a closure under `name`. See [`Registry::register_fn`].
    pub fn register_fn<F, R>(&self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(&Args) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.inner.write().register_fn(name, f)
    }

    /// Returns the handler registered under `name`. See [`Registry::get`].
    pub fn get(&self, name: &str) -> Result<Arc<dyn Handler>, RegistryError> {
        self.inner.read().get(name)
    }

    /// Removes the handler registered under `name`. See [`Registry::remove`].
    pub fn remove(&self, name: &str) -> Result<Arc<dyn Handler>, RegistryError> {
        self.inner.write().remove(name)
    }

    /// Returns the registered names in lexicographic order.
    pub fn list_names(&self) -> Vec<String> {
        self.inner.read().list_names()
    }

    /// Returns true if a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains(name)
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Returns a point-in-time copy of the registry.
    pub fn snapshot(&self) -> Registry {
        self.inner.read().clone()
    }
}

impl From<Registry> for SharedRegistry {
    fn from(registry: Registry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }
}

impl Lookup for SharedRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.inner.read().lookup(name)
    }
}

impl std::fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedRegistry")
            .field(&*self.inner.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{CallContext, FnHandler};
    use serde_json::json;

    fn constant(value: i64) -> impl Handler {
        SimpleFnHandler::new(move |_a: &Args| Ok::<_, anyhow::Error>(value))
    }

    fn call(handler: &Arc<dyn Handler>) -> serde_json::Value {
        handler
            .call(&Args::default(), &CallContext::default())
            .unwrap()
    }

    #[test]
    fn test_register_and_get_returns_same_handler() {
        let mut registry = Registry::new();
        let handler: Arc<dyn Handler> = Arc::new(constant(1));
        registry.register_arc("one", handler.clone()).unwrap();

        let found = registry.get("one").unwrap();
        assert!(Arc::ptr_eq(&found, &handler));
        assert_eq!(call(&found), json!(1));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let registry = Registry::new();
        let err = registry.get("missing").unwrap_err();
        assert_eq!(err, RegistryError::NotFound("missing".into()));
        assert_eq!(err.to_string(), "no handler registered under 'missing'");
    }

    #[test]
    fn test_duplicate_registration_rejected_and_first_kept() {
        let mut registry = Registry::new();
        registry.register("x", constant(1)).unwrap();

        let err = registry.register("x", constant(2)).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("x".into()));
        assert_eq!(call(&registry.get("x").unwrap()), json!(1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_invalid_name() {
        let mut registry = Registry::new();
        let err = registry.register("bad name", constant(1)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidName { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_returns_handler() {
        let mut registry = Registry::new();
        registry.register("gone", constant(9)).unwrap();

        let removed = registry.remove("gone").unwrap();
        assert_eq!(call(&removed), json!(9));
        assert!(!registry.contains("gone"));
        assert!(registry.get("gone").is_err());
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let mut registry = Registry::new();
        let err = registry.remove("nothing").unwrap_err();
        assert_eq!(err, RegistryError::NotFound("nothing".into()));
    }

    #[test]
    fn test_name_can_be_reused_after_remove() {
        let mut registry = Registry::new();
        registry.register("slot", constant(1)).unwrap();
        registry.remove("slot").unwrap();
        registry.register("slot", constant(2)).unwrap();
        assert_eq!(call(&registry.get("slot").unwrap()), json!(2));
    }

    #[test]
    fn test_list_names_sorted_and_stable() {
        let mut registry = Registry::new();
        for name in ["c", "a", "b"] {
            registry.register(name, constant(0)).unwrap();
        }

        let first = registry.list_names();
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, registry.list_names());
    }

    #[test]
    fn test_list_names_is_a_snapshot() {
        let mut registry = Registry::new();
        registry.register("a", constant(0)).unwrap();
        let snapshot = registry.list_names();

        registry.register("b", constant(0)).unwrap();
        assert_eq!(snapshot, vec!["a"]);
        assert_eq!(registry.list_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_describe() {
        let mut registry = Registry::new();
        registry
            .register(
                "greet",
                FnHandler::new(|_a: &Args, _c: &CallContext| Ok::<_, anyhow::Error>("hi"))
                    .describe("Say hi")
                    .arity(Arity::exact(0)),
            )
            .unwrap();

        let info = registry.describe("greet").unwrap();
        assert_eq!(info.name, "greet");
        assert_eq!(info.description.as_deref(), Some("Say hi"));
        assert_eq!(info.arity, Arity::exact(0));
        assert!(registry.describe("nope").is_err());
    }

    #[test]
    fn test_group_registers_prefixed_names() {
        let mut registry = Registry::new();
        registry
            .group("math", |g| {
                g.handler("one", constant(1))
                    .group("more", |g| g.handler("two", constant(2)))
            })
            .unwrap();

        assert_eq!(registry.list_names(), vec!["math.more.two", "math.one"]);
        assert_eq!(call(&registry.get("math.more.two").unwrap()), json!(2));
    }

    #[test]
    fn test_group_is_atomic_on_conflict() {
        let mut registry = Registry::new();
        registry.register("math.two", constant(0)).unwrap();

        let err = registry
            .group("math", |g| g.handler("one", constant(1)).handler("two", constant(2)))
            .unwrap_err();

        assert_eq!(err, RegistryError::DuplicateName("math.two".into()));
        assert!(!registry.contains("math.one"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_group_rejects_repeats_within_group() {
        let mut registry = Registry::new();
        let err = registry
            .group("g", |g| g.handler("x", constant(1)).handler("x", constant(2)))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("g.x".into()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_group_rejects_invalid_member_name() {
        let mut registry = Registry::new();
        let err = registry
            .group("g", |g| g.handler("ok", constant(1)).handler("", constant(2)))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidName { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_trait() {
        let mut registry = Registry::new();
        registry.register("a", constant(1)).unwrap();
        assert!(registry.lookup("a").is_some());
        assert!(registry.lookup("b").is_none());
    }

    #[test]
    fn test_shared_registry_clones_share_state() {
        let shared = SharedRegistry::new();
        let other = shared.clone();

        shared.register("a", constant(1)).unwrap();
        assert!(other.contains("a"));
        assert_eq!(other.list_names(), vec!["a"]);

        other.remove("a").unwrap();
        assert!(shared.is_empty());
        assert_eq!(
            shared.remove("a").unwrap_err(),
            RegistryError::NotFound("a".into())
        );
    }

    #[test]
    fn test_shared_registry_concurrent_registration() {
        let shared = SharedRegistry::new();

        std::thread::scope(|s| {
            for i in 0..8 {
                let shared = shared.clone();
                s.spawn(move || {
                    shared
                        .register_fn(&format!("h{}", i), move |_a: &Args| {
                            Ok::<_, anyhow::Error>(i)
                        })
                        .unwrap();
                    let _ = shared.list_names();
                });
            }
        });

        assert_eq!(shared.len(), 8);
        let h3 = shared.get("h3").unwrap();
        assert_eq!(call(&h3), json!(3));
    }

    #[test]
    fn test_shared_registry_duplicate_across_threads() {
        let shared = SharedRegistry::new();

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let shared = shared.clone();
                    s.spawn(move || shared.register("only", constant(0)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let shared = SharedRegistry::from({
            let mut r = Registry::new();
            r.register("a", constant(1)).unwrap();
            r
        });

        let snap = shared.snapshot();
        shared.register("b", constant(2)).unwrap();
        assert_eq!(snap.list_names(), vec!["a"]);
        assert_eq!(shared.list_names(), vec!["a", "b"]);
    }
}

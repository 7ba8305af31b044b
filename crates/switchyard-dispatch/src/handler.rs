//! Handler types.
//!
//! This module provides the core types for building handlers, the units of
//! behavior a [`Registry`](crate::Registry) maps names to.
//!
//! # Calling Convention
//!
//! Every handler is invoked the same way: it receives the positional
//! arguments of the call as [`Args`] (a sequence of JSON values) and a
//! [`CallContext`] describing the call, and returns a [`HandlerResult`]
//! holding a JSON payload or an error.
//!
//! Handlers do not deal with lookup, hooks, panics or result formatting.
//! The [`Dispatcher`](crate::Dispatcher) owns all of that, so a handler can
//! be unit tested by calling it directly and checking the value it returns.
//!
//! # Core Types
//!
//! - [`Handler`]: Trait for handlers (`&self`, `Send + Sync`)
//! - [`FnHandler`]: Closure adapter receiving args and context
//! - [`SimpleFnHandler`]: Closure adapter receiving args only
//! - [`Args`]: Positional arguments with typed accessors
//! - [`Arity`]: Accepted argument counts, checked before invocation
//! - [`CallContext`]: Per-call information plus [`Extensions`]
//! - [`HandlerResult`]: The result type for handlers

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The result type for handlers.
///
/// Enables use of the `?` operator for error propagation.
pub type HandlerResult = Result<Value, anyhow::Error>;

/// Error produced when an argument is missing or has the wrong shape.
///
/// When a handler propagates this error with `?`, the dispatcher reports the
/// failure as [`FailureKind::InvalidArguments`](crate::FailureKind) rather
/// than a generic handler error.
#[derive(Debug, Error)]
pub enum ArgError {
    #[error("missing argument at position {index}")]
    Missing { index: usize },

    #[error("argument {index} is not a valid {expected}")]
    Type {
        index: usize,
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Positional arguments passed to a handler.
///
/// # Example
///
/// ```rust
/// use switchyard_dispatch::Args;
/// use serde_json::json;
///
/// let args = Args::new(vec![json!(2), json!("three")]);
/// let n: i64 = args.get(0)?;
/// let s: String = args.get(1)?;
/// assert_eq!((n, s.as_str()), (2, "three"));
/// assert!(args.get::<i64>(1).is_err());
/// # Ok::<(), switchyard_dispatch::ArgError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
}

impl Args {
    /// Creates argument list from raw values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Builds an argument list with `preset` values placed before `args`.
    pub fn with_preset(preset: &[Value], args: &Args) -> Self {
        let mut values = Vec::with_capacity(preset.len() + args.len());
        values.extend_from_slice(preset);
        values.extend_from_slice(&args.values);
        Self { values }
    }

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw value at `index`, if present.
    pub fn raw(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns all raw values.
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Iterates over the raw values.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Deserializes the argument at `index` into `T`.
    ///
    /// Returns [`ArgError::Missing`] if there is no such argument and
    /// [`ArgError::Type`] if it does not deserialize.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgError> {
        let value = self
            .values
            .get(index)
            .ok_or(ArgError::Missing { index })?;
        decode(index, value)
    }

    /// Deserializes the argument at `index` if it is present.
    pub fn get_opt<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, ArgError> {
        self.values
            .get(index)
            .map(|value| decode(index, value))
            .transpose()
    }

    /// Deserializes every argument from `start` onwards.
    pub fn rest<T: DeserializeOwned>(&self, start: usize) -> Result<Vec<T>, ArgError> {
        self.values
            .iter()
            .enumerate()
            .skip(start)
            .map(|(index, value)| decode(index, value))
            .collect()
    }

    /// Consumes the list, returning the raw values.
    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }
}

fn decode<T: DeserializeOwned>(index: usize, value: &Value) -> Result<T, ArgError> {
    T::deserialize(value).map_err(|source| ArgError::Type {
        index,
        expected: std::any::type_name::<T>(),
        source,
    })
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// The argument counts a handler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Minimum number of arguments
    pub min: usize,
    /// Maximum number of arguments, `None` for unbounded
    pub max: Option<usize>,
}

impl Arity {
    /// Accepts any number of arguments.
    pub const ANY: Arity = Arity { min: 0, max: None };

    /// Accepts exactly `n` arguments.
    pub const fn exact(n: usize) -> Self {
        Arity {
            min: n,
            max: Some(n),
        }
    }

    /// Accepts `n` or more arguments.
    pub const fn at_least(n: usize) -> Self {
        Arity { min: n, max: None }
    }

    /// Accepts between `min` and `max` arguments, inclusive.
    pub const fn between(min: usize, max: usize) -> Self {
        Arity {
            min,
            max: Some(max),
        }
    }

    /// Returns true if `count` arguments are acceptable.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl Default for Arity {
    fn default() -> Self {
        Arity::ANY
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (0, None) => write!(f, "any number of"),
            (min, None) => write!(f, "at least {}", min),
            (min, Some(max)) if min == max => write!(f, "exactly {}", min),
            (min, Some(max)) => write!(f, "between {} and {}", min, max),
        }
    }
}

/// Type-safe container for injecting custom state into a call.
///
/// Pre-dispatch hooks insert values that the handler can retrieve, which
/// enables dependency injection without changing handler signatures.
///
/// # Example
///
/// ```rust
/// use switchyard_dispatch::CallContext;
///
/// struct RequestId(u64);
///
/// let mut ctx = CallContext::new("report.build");
/// ctx.extensions.insert(RequestId(7));
///
/// let id = ctx.extensions.get_required::<RequestId>()?;
/// assert_eq!(id.0, 7);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any>>,
}

impl Extensions {
    /// Creates a new empty extensions container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing and returning any value of the same type.
    pub fn insert<T: 'static>(&mut self, val: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(val))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Gets a reference to a value of the specified type.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Gets a mutable reference to a value of the specified type.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut())
    }

    /// Gets a required reference to a value of the specified type.
    ///
    /// Returns an error if no value of this type exists.
    pub fn get_required<T: 'static>(&self) -> Result<&T, anyhow::Error> {
        self.get::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "Extension missing: type {} not found in context",
                std::any::type_name::<T>()
            )
        })
    }

    /// Removes a value of the specified type, returning it if it existed.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Returns `true` if a value of the specified type is stored.
    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of extensions stored.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no extensions are stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish_non_exhaustive()
    }
}

/// Context passed to handlers.
///
/// A fresh context is created for every dispatch, so extensions never leak
/// from one call into the next.
#[derive(Debug, Default)]
pub struct CallContext {
    /// The name the handler was dispatched under (e.g., `"math.add"`)
    pub name: String,

    /// Per-call state injected by pre-dispatch hooks.
    pub extensions: Extensions,
}

impl CallContext {
    /// Creates a context for a call to `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: Extensions::new(),
        }
    }
}

/// Trait for types that can be converted into a [`HandlerResult`].
///
/// Closures registered through [`FnHandler`] and [`SimpleFnHandler`] can
/// return any `Result<T, E>` where `T` serializes and `E` converts into
/// `anyhow::Error`. The success value is converted into a JSON payload.
///
/// ```rust
/// use switchyard_dispatch::IntoHandlerResult;
/// use serde_json::json;
///
/// let result = Ok::<_, anyhow::Error>(vec![1, 2]).into_handler_result();
/// assert_eq!(result.unwrap(), json!([1, 2]));
/// ```
pub trait IntoHandlerResult {
    /// Convert this type into a [`HandlerResult`].
    fn into_handler_result(self) -> HandlerResult;
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: Serialize,
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> HandlerResult {
        let value = self.map_err(Into::into)?;
        Ok(serde_json::to_value(value)?)
    }
}

/// Trait for handlers.
///
/// Handlers take `&self` and must be `Send + Sync`: a registered handler is
/// shared between every caller that resolves its name. Handlers that keep
/// mutable state use interior mutability (atomics, locks).
///
/// # Example
///
/// ```rust
/// use switchyard_dispatch::{Args, CallContext, Handler, HandlerResult};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// struct Counter { count: AtomicU64 }
///
/// impl Handler for Counter {
///     fn call(&self, _args: &Args, _ctx: &CallContext) -> HandlerResult {
///         let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
///         Ok(n.into())
///     }
/// }
/// ```
pub trait Handler: Send + Sync {
    /// Invoke the handler with the given arguments and context.
    fn call(&self, args: &Args, ctx: &CallContext) -> HandlerResult;

    /// A one-line, human-readable summary of what the handler does.
    fn description(&self) -> Option<&str> {
        None
    }

    /// The argument counts this handler accepts.
    ///
    /// The dispatcher rejects calls outside this range without invoking
    /// the handler.
    fn arity(&self) -> Arity {
        Arity::ANY
    }
}

impl fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("description", &self.description())
            .field("arity", &self.arity())
            .finish_non_exhaustive()
    }
}

/// A wrapper that implements [`Handler`] for closures taking args and context.
///
/// # Example
///
/// ```rust
/// use switchyard_dispatch::{Args, Arity, CallContext, FnHandler, Handler};
/// use serde_json::json;
///
/// let handler = FnHandler::new(|args: &Args, ctx: &CallContext| {
///     let who: String = args.get(0)?;
///     Ok::<_, anyhow::Error>(format!("{} greets {}", ctx.name, who))
/// })
/// .describe("Greet someone")
/// .arity(Arity::exact(1));
///
/// let out = handler.call(&Args::new(vec![json!("ada")]), &CallContext::new("greet"));
/// assert_eq!(out.unwrap(), json!("greet greets ada"));
/// ```
pub struct FnHandler<F, R> {
    f: F,
    description: Option<String>,
    arity: Arity,
    _phantom: std::marker::PhantomData<fn() -> R>,
}

impl<F, R> FnHandler<F, R>
where
    F: Fn(&Args, &CallContext) -> R + Send + Sync,
    R: IntoHandlerResult,
{
    /// Creates a new FnHandler wrapping the given closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            description: None,
            arity: Arity::ANY,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Sets the handler description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the accepted argument counts.
    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }
}

impl<F, R> Handler for FnHandler<F, R>
where
    F: Fn(&Args, &CallContext) -> R + Send + Sync,
    R: IntoHandlerResult,
{
    fn call(&self, args: &Args, ctx: &CallContext) -> HandlerResult {
        (self.f)(args, ctx).into_handler_result()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn arity(&self) -> Arity {
        self.arity
    }
}

/// A handler wrapper for closures that don't need [`CallContext`].
///
/// This is the simpler variant of [`FnHandler`]. The context parameter is
/// accepted but ignored internally.
///
/// # Example
///
/// ```rust
/// use switchyard_dispatch::{Args, CallContext, Handler, SimpleFnHandler};
/// use serde_json::json;
///
/// let add = SimpleFnHandler::new(|args: &Args| {
///     Ok::<_, anyhow::Error>(args.get::<i64>(0)? + args.get::<i64>(1)?)
/// });
///
/// let out = add.call(&Args::new(vec![json!(2), json!(3)]), &CallContext::default());
/// assert_eq!(out.unwrap(), json!(5));
/// ```
pub struct SimpleFnHandler<F, R> {
    f: F,
    description: Option<String>,
    arity: Arity,
    _phantom: std::marker::PhantomData<fn() -> R>,
}

impl<F, R> SimpleFnHandler<F, R>
where
    F: Fn(&Args) -> R + Send + Sync,
    R: IntoHandlerResult,
{
    /// Creates a new SimpleFnHandler wrapping the given closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            description: None,
            arity: Arity::ANY,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Sets the handler description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the accepted argument counts.
    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }
}

impl<F, R> Handler for SimpleFnHandler<F, R>
where
    F: Fn(&Args) -> R + Send + Sync,
    R: IntoHandlerResult,
{
    fn call(&self, args: &Args, _ctx: &CallContext) -> HandlerResult {
        (self.f)(args).into_handler_result()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn arity(&self) -> Arity {
        self.arity
    }
}

//! Dispatch logic.
//!
//! A [`Dispatcher`] resolves a name through a [`Lookup`], invokes the
//! handler and normalizes every outcome into an [`InvocationResult`]:
//!
//! | Outcome | Result |
//! |---------|--------|
//! | name not registered | `Failure(NotFound)` |
//! | argument count outside the handler's arity | `Failure(InvalidArguments)` |
//! | hook returns an error or panics | `Failure(HookError)` |
//! | handler returns an [`ArgError`] | `Failure(InvalidArguments)` |
//! | handler returns any other error, or panics | `Failure(HandlerError)` |
//! | handler returns a value | `Success(value)` |
//!
//! Nothing propagates across the dispatch boundary, so a batch of calls
//! always runs to completion.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, debug_span, warn};

use crate::handler::{ArgError, Args, CallContext, Handler};
use crate::hooks::{HookError, Hooks};
use crate::registry::Lookup;
use crate::result::{FailureKind, InvocationResult};

/// One entry of a batch dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// The handler name to dispatch to
    pub name: String,
    /// Positional arguments
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Call {
    /// Creates a call to `name` with `args`.
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Resolves names and invokes handlers, capturing outcomes.
///
/// A dispatcher holds hook configuration only; the registry is passed to
/// each call, so one dispatcher can serve several registries.
///
/// # Example
///
/// ```rust
/// use switchyard_dispatch::{Args, Dispatcher, FailureKind, Registry};
/// use serde_json::json;
///
/// let mut registry = Registry::new();
/// registry.register_fn("add", |a: &Args| {
///     Ok::<_, anyhow::Error>(a.get::<i64>(0)? + a.get::<i64>(1)?)
/// })?;
///
/// let dispatcher = Dispatcher::new();
/// let ok = dispatcher.dispatch(&registry, "add", vec![json!(2), json!(3)]);
/// assert_eq!(ok.value(), Some(&json!(5)));
///
/// let missing = dispatcher.dispatch(&registry, "missing", vec![]);
/// assert_eq!(missing.kind(), Some(FailureKind::NotFound));
/// # Ok::<(), switchyard_dispatch::RegistryError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Dispatcher {
    global_hooks: Hooks,
    name_hooks: HashMap<String, Hooks>,
    catch_panics: bool,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            global_hooks: Hooks::new(),
            name_hooks: HashMap::new(),
            catch_panics: true,
        }
    }
}

impl Dispatcher {
    /// Creates a dispatcher with no hooks that catches handler panics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets hooks that run for every dispatched name.
    ///
    /// Global hooks run before name-specific hooks.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.global_hooks = hooks;
        self
    }

    /// Sets hooks that run only when `name` is dispatched.
    pub fn hooks_for(mut self, name: &str, hooks: Hooks) -> Self {
        self.name_hooks.insert(name.to_string(), hooks);
        self
    }

    /// Controls whether handler and hook panics are converted into failures.
    ///
    /// Enabled by default. When disabled, a panicking handler or hook
    /// unwinds through the dispatcher.
    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }

    /// Dispatches one call to `name`.
    pub fn dispatch<L>(&self, registry: &L, name: &str, args: Vec<Value>) -> InvocationResult
    where
        L: Lookup + ?Sized,
    {
        let span = debug_span!("dispatch", name);
        let _enter = span.enter();

        let result = self.dispatch_inner(registry, name, Args::new(args));
        match &result {
            InvocationResult::Success(_) => debug!("dispatch succeeded"),
            InvocationResult::Failure(f) => {
                debug!(kind = %f.kind, message = %f.message, "dispatch failed")
            }
        }
        result
    }

    /// Dispatches every call in order, collecting one result per call.
    ///
    /// Failures do not stop the batch.
    pub fn dispatch_batch<L, I>(&self, registry: &L, calls: I) -> Vec<InvocationResult>
    where
        L: Lookup + ?Sized,
        I: IntoIterator<Item = Call>,
    {
        calls
            .into_iter()
            .map(|call| self.dispatch(registry, &call.name, call.args))
            .collect()
    }

    fn dispatch_inner<L>(&self, registry: &L, name: &str, args: Args) -> InvocationResult
    where
        L: Lookup + ?Sized,
    {
        let Some(handler) = registry.lookup(name) else {
            return InvocationResult::failure(
                FailureKind::NotFound,
                format!("no handler registered under '{}'", name),
            );
        };

        let arity = handler.arity();
        if !arity.accepts(args.len()) {
            return InvocationResult::failure(
                FailureKind::InvalidArguments,
                format!(
                    "'{}' expects {} argument(s), got {}",
                    name,
                    arity,
                    args.len()
                ),
            );
        }

        let name_hooks = self.name_hooks.get(name);
        let mut ctx = CallContext::new(name);

        let pre = self.guard_hooks(name, || {
            self.global_hooks
                .run_pre_dispatch(&args, &mut ctx)
                .and_then(|()| match name_hooks {
                    Some(hooks) => hooks.run_pre_dispatch(&args, &mut ctx),
                    None => Ok(()),
                })
        });
        if let Err(failure) = pre {
            return failure;
        }

        let value = match self.invoke(handler.as_ref(), &args, &ctx) {
            Ok(value) => value,
            Err(failure) => return failure,
        };

        let post = self.guard_hooks(name, || {
            self.global_hooks
                .run_post_dispatch(&ctx, value)
                .and_then(|value| match name_hooks {
                    Some(hooks) => hooks.run_post_dispatch(&ctx, value),
                    None => Ok(value),
                })
        });
        match post {
            Ok(value) => InvocationResult::Success(value),
            Err(failure) => failure,
        }
    }

    /// Runs a hook phase, turning hook errors and hook panics into
    /// `HookError` failures.
    fn guard_hooks<T, F>(&self, name: &str, phase: F) -> Result<T, InvocationResult>
    where
        F: FnOnce() -> Result<T, HookError>,
    {
        let outcome = if self.catch_panics {
            match catch_unwind(AssertUnwindSafe(phase)) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(name = %name, %message, "hook panicked");
                    return Err(InvocationResult::failure(
                        FailureKind::HookError,
                        format!("hook panicked: {}", message),
                    ));
                }
            }
        } else {
            phase()
        };

        outcome.map_err(hook_failure)
    }

    fn invoke(
        &self,
        handler: &dyn Handler,
        args: &Args,
        ctx: &CallContext,
    ) -> Result<Value, InvocationResult> {
        let outcome = if self.catch_panics {
            match catch_unwind(AssertUnwindSafe(|| handler.call(args, ctx))) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(name = %ctx.name, %message, "handler panicked");
                    return Err(InvocationResult::failure(
                        FailureKind::HandlerError,
                        format!("handler panicked: {}", message),
                    ));
                }
            }
        } else {
            handler.call(args, ctx)
        };

        outcome.map_err(|err| {
            let kind = if err.downcast_ref::<ArgError>().is_some() {
                FailureKind::InvalidArguments
            } else {
                FailureKind::HandlerError
            };
            InvocationResult::failure(kind, format!("{:#}", err))
        })
    }
}

fn hook_failure(err: HookError) -> InvocationResult {
    InvocationResult::failure(FailureKind::HookError, err.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Dispatches one call with a default [`Dispatcher`].
pub fn dispatch<L>(registry: &L, name: &str, args: Vec<Value>) -> InvocationResult
where
    L: Lookup + ?Sized,
{
    Dispatcher::new().dispatch(registry, name, args)
}

/// Dispatches a batch of calls with a default [`Dispatcher`].
pub fn dispatch_batch<L, I>(registry: &L, calls: I) -> Vec<InvocationResult>
where
    L: Lookup + ?Sized,
    I: IntoIterator<Item = Call>,
{
    Dispatcher::new().dispatch_batch(registry, calls)
}

//! Callbacks that wrap a handler call.
//!
//! A [`Hooks`] set is attached to a [`Dispatcher`](crate::Dispatcher) either
//! for every name or for a single one. The dispatcher runs global hooks
//! before name-specific ones:
//!
//! ```text
//! lookup, arity check
//!   -> pre-dispatch hooks   (may veto, may stash values in ctx.extensions)
//!   -> handler
//!   -> post-dispatch hooks  (receive the payload, return a replacement)
//! ```
//!
//! Post-dispatch hooks are skipped when the handler fails. A hook that
//! returns `Err` or panics ends the call with
//! [`FailureKind::HookError`](crate::FailureKind).

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::handler::{Args, CallContext};

/// Which side of the handler call a hook runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// Before the handler; can veto the call.
    PreDispatch,
    /// After a successful handler; owns the payload.
    PostDispatch,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::PreDispatch => write!(f, "pre-dispatch"),
            HookPhase::PostDispatch => write!(f, "post-dispatch"),
        }
    }
}

/// A hook's refusal to let a call complete.
///
/// The `Display` form is what ends up in the failure message of the
/// resulting [`InvocationResult`](crate::InvocationResult).
#[derive(Debug, Error)]
#[error("hook error ({phase}): {message}")]
pub struct HookError {
    pub message: String,
    pub phase: HookPhase,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HookError {
    /// Vetoes a call before the handler runs.
    pub fn pre_dispatch(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            phase: HookPhase::PreDispatch,
            source: None,
        }
    }

    /// Rejects a handler payload after the fact.
    pub fn post_dispatch(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            phase: HookPhase::PostDispatch,
            source: None,
        }
    }

    /// Attaches the error that caused the veto.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.source = Some(source.into());
        self
    }
}

/// A stored pre-dispatch callback. The context is mutable so values placed
/// in `ctx.extensions` reach the handler.
pub type PreDispatchFn =
    Arc<dyn Fn(&Args, &mut CallContext) -> Result<(), HookError> + Send + Sync>;

/// A stored post-dispatch callback.
pub type PostDispatchFn = Arc<
    dyn Fn(&CallContext, serde_json::Value) -> Result<serde_json::Value, HookError>
        + Send
        + Sync,
>;

/// Ordered pre- and post-dispatch callbacks.
///
/// Within each phase callbacks run in the order they were added.
#[derive(Clone, Default)]
pub struct Hooks {
    pre_dispatch: Vec<PreDispatchFn>,
    post_dispatch: Vec<PostDispatchFn>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when neither phase has a callback.
    pub fn is_empty(&self) -> bool {
        self.pre_dispatch.is_empty() && self.post_dispatch.is_empty()
    }

    /// Adds a pre-dispatch hook.
    ///
    /// # Example
    ///
    /// ```rust
    /// use switchyard_dispatch::{Hooks, HookError};
    ///
    /// struct Caller(String);
    ///
    /// let hooks = Hooks::new()
    ///     .pre_dispatch(|args, ctx| {
    ///         if args.is_empty() {
    ///             return Err(HookError::pre_dispatch("at least one argument required"));
    ///         }
    ///         ctx.extensions.insert(Caller("cli".into()));
    ///         Ok(())
    ///     });
    /// ```
    pub fn pre_dispatch<F>(mut self, f: F) -> Self
    where
        F: Fn(&Args, &mut CallContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.pre_dispatch.push(Arc::new(f));
        self
    }

    /// Adds a post-dispatch hook.
    pub fn post_dispatch<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallContext, serde_json::Value) -> Result<serde_json::Value, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.post_dispatch.push(Arc::new(f));
        self
    }

    /// Runs pre-dispatch callbacks until one vetoes.
    pub fn run_pre_dispatch(&self, args: &Args, ctx: &mut CallContext) -> Result<(), HookError> {
        for hook in &self.pre_dispatch {
            hook(args, ctx)?;
        }
        Ok(())
    }

    /// Threads `data` through each post-dispatch callback in turn.
    pub fn run_post_dispatch(
        &self,
        ctx: &CallContext,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, HookError> {
        let mut current = data;
        for hook in &self.post_dispatch {
            current = hook(ctx, current)?;
        }
        Ok(current)
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre", &self.pre_dispatch.len())
            .field("post", &self.post_dispatch.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_veto_message_names_phase() {
        let veto = HookError::pre_dispatch("alias 'deploy' is locked");
        assert_eq!(veto.phase, HookPhase::PreDispatch);
        assert_eq!(
            veto.to_string(),
            "hook error (pre-dispatch): alias 'deploy' is locked"
        );

        let reject = HookError::post_dispatch("payload too large");
        assert_eq!(
            reject.to_string(),
            "hook error (post-dispatch): payload too large"
        );
    }

    #[test]
    fn test_veto_keeps_cause_in_chain() {
        use std::error::Error as _;

        let cause = serde_json::from_str::<Value>("{").unwrap_err();
        let veto = HookError::pre_dispatch("policy file unreadable").with_source(cause);
        assert!(veto.source().is_some());
        assert!(veto.message.contains("policy"));
    }

    #[test]
    fn test_is_empty_counts_both_phases() {
        assert!(Hooks::new().is_empty());
        assert!(!Hooks::new().pre_dispatch(|_, _| Ok(())).is_empty());
        assert!(!Hooks::new().post_dispatch(|_, v| Ok(v)).is_empty());
    }

    #[test]
    fn test_pre_dispatch_runs_every_callback_in_order() {
        let seen = Arc::new(AtomicUsize::new(0));
        let first = seen.clone();
        let second = seen.clone();

        let hooks = Hooks::new()
            .pre_dispatch(move |_, _| {
                assert_eq!(first.fetch_add(1, Ordering::SeqCst), 0);
                Ok(())
            })
            .pre_dispatch(move |_, _| {
                assert_eq!(second.fetch_add(1, Ordering::SeqCst), 1);
                Ok(())
            });

        let mut ctx = CallContext::new("greet");
        hooks.run_pre_dispatch(&Args::default(), &mut ctx).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_pre_dispatch_veto_skips_later_callbacks() {
        let hooks = Hooks::new()
            .pre_dispatch(|_, ctx| {
                if ctx.name.starts_with("admin.") {
                    return Err(HookError::pre_dispatch("admin aliases disabled"));
                }
                Ok(())
            })
            .pre_dispatch(|_, _| panic!("ran after veto"));

        let mut ctx = CallContext::new("admin.wipe");
        let veto = hooks
            .run_pre_dispatch(&Args::default(), &mut ctx)
            .unwrap_err();
        assert_eq!(veto.message, "admin aliases disabled");
    }

    #[test]
    fn test_pre_dispatch_stashes_value_for_later_callback() {
        struct Caller(&'static str);
        struct Audit(Vec<String>);

        let hooks = Hooks::new()
            .pre_dispatch(|_, ctx| {
                ctx.extensions.insert(Caller("cron"));
                Ok(())
            })
            .pre_dispatch(|args, ctx| {
                let caller = ctx.extensions.get::<Caller>().map_or("unknown", |c| c.0);
                let line = format!("{} called {} with {} args", caller, ctx.name, args.len());
                ctx.extensions.insert(Audit(vec![line]));
                Ok(())
            });

        let mut ctx = CallContext::new("backup");
        hooks
            .run_pre_dispatch(&Args::new(vec![json!("/srv")]), &mut ctx)
            .unwrap();
        assert_eq!(
            ctx.extensions.get::<Audit>().unwrap().0,
            vec!["cron called backup with 1 args".to_string()]
        );
    }

    #[test]
    fn test_post_dispatch_threads_payload() {
        let hooks = Hooks::new()
            .post_dispatch(|_, data| Ok(json!({ "value": data })))
            .post_dispatch(|ctx, mut data| {
                data["alias"] = json!(ctx.name);
                Ok(data)
            });

        let ctx = CallContext::new("sum");
        let out = hooks.run_post_dispatch(&ctx, json!(5)).unwrap();
        assert_eq!(out, json!({"value": 5, "alias": "sum"}));
    }

    #[test]
    fn test_post_dispatch_reject_drops_payload() {
        let hooks = Hooks::new().post_dispatch(|_, data| {
            if data.is_null() {
                Err(HookError::post_dispatch("empty result"))
            } else {
                Ok(data)
            }
        });

        let ctx = CallContext::new("lookup");
        assert_eq!(hooks.run_post_dispatch(&ctx, json!("x")).unwrap(), json!("x"));
        let reject = hooks.run_post_dispatch(&ctx, Value::Null).unwrap_err();
        assert_eq!(reject.phase, HookPhase::PostDispatch);
    }
}

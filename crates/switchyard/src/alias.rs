//! Alias handlers.
//!
//! An alias forwards to another handler with preset leading arguments, so
//! `inc` can be `math.add` with `1` always passed first.

use std::sync::Arc;

use serde_json::Value;
use switchyard_dispatch::{Args, Arity, CallContext, Handler, HandlerResult};

/// A handler that calls `target` with `preset` arguments prepended.
pub struct AliasHandler {
    target: String,
    inner: Arc<dyn Handler>,
    preset: Vec<Value>,
    description: String,
}

impl AliasHandler {
    /// Creates an alias for `inner`, which is registered as `target`.
    pub fn new(
        target: impl Into<String>,
        inner: Arc<dyn Handler>,
        preset: Vec<Value>,
        description: Option<String>,
    ) -> Self {
        let target = target.into();
        let description = description.unwrap_or_else(|| describe_target(&target, &preset));
        Self {
            target,
            inner,
            preset,
            description,
        }
    }

    /// The name this alias forwards to.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns true if the target can accept the preset arguments at all.
    pub fn is_satisfiable(&self) -> bool {
        self.inner
            .arity()
            .max
            .map_or(true, |max| self.preset.len() <= max)
    }
}

fn describe_target(target: &str, preset: &[Value]) -> String {
    if preset.is_empty() {
        format!("alias for {}", target)
    } else {
        let shown: Vec<String> = preset.iter().map(Value::to_string).collect();
        format!("alias for {} {}", target, shown.join(" "))
    }
}

impl Handler for AliasHandler {
    fn call(&self, args: &Args, ctx: &CallContext) -> HandlerResult {
        self.inner.call(&Args::with_preset(&self.preset, args), ctx)
    }

    fn description(&self) -> Option<&str> {
        Some(&self.description)
    }

    /// The target's arity, shifted by the preset argument count.
    fn arity(&self) -> Arity {
        let inner = self.inner.arity();
        let taken = self.preset.len();
        Arity {
            min: inner.min.saturating_sub(taken),
            max: inner.max.map(|max| max.saturating_sub(taken)),
        }
    }
}

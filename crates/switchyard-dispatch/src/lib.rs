//! Named handler registry and dispatch.
//!
//! `switchyard-dispatch` maps unique names to handlers and invokes them by
//! name, turning every outcome into a structured [`InvocationResult`]. It
//! has no global state: callers create a [`Registry`] and pass it to the
//! [`Dispatcher`], so tests and embedders get isolated registries.
//!
//! # Features
//!
//! - **Registry**: Unique names, duplicate registration rejected, groups
//!   registered atomically under a dotted prefix
//! - **Handler trait**: One calling convention (JSON args in, JSON value
//!   out) with closure adapters and optional arity/description metadata
//! - **Dispatcher**: Lookup failures, handler errors and panics all become
//!   failure results; nothing crosses the dispatch boundary
//! - **Hook system**: Pre/post dispatch hooks, global or per name
//! - **Shared registry**: Read-concurrent, write-serialized wrapper
//! - **Output modes**: Text, JSON and YAML rendering of results
//!
//! # Usage
//!
//! ```rust
//! use switchyard_dispatch::{dispatch, Args, FailureKind, Registry};
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! registry.register_fn("add", |a: &Args| {
//!     Ok::<_, anyhow::Error>(a.get::<i64>(0)? + a.get::<i64>(1)?)
//! })?;
//!
//! let result = dispatch(&registry, "add", vec![json!(2), json!(3)]);
//! assert!(result.is_success());
//! assert_eq!(result.value(), Some(&json!(5)));
//!
//! let missing = dispatch(&registry, "sub", vec![]);
//! assert_eq!(missing.kind(), Some(FailureKind::NotFound));
//! # Ok::<(), switchyard_dispatch::RegistryError>(())
//! ```

// Core modules
mod dispatch;
mod handler;
mod hooks;
mod names;
mod output;
mod registry;
mod result;
mod serialize;

// Re-export core types
pub use dispatch::{dispatch, dispatch_batch, Call, Dispatcher};

pub use handler::{
    ArgError, Args, Arity, CallContext, Extensions, FnHandler, Handler, HandlerResult,
    IntoHandlerResult, SimpleFnHandler,
};

pub use hooks::{HookError, HookPhase, Hooks, PostDispatchFn, PreDispatchFn};

pub use names::{join_name, split_name, validate_name};

pub use output::{render_result, value_to_text, OutputMode};

pub use registry::{GroupBuilder, HandlerInfo, Lookup, Registry, RegistryError, SharedRegistry};

pub use result::{Failure, FailureKind, InvocationResult};

pub use serialize::{serialize_structured, to_json, to_json_line, to_yaml, SerializeError};

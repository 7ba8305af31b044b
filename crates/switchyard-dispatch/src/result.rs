//! Structured dispatch outcomes.
//!
//! Every dispatch produces an [`InvocationResult`], never a panic or an
//! error crossing the dispatch boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Why a dispatch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No handler is registered under the requested name
    NotFound,
    /// The handler returned an error or panicked
    HandlerError,
    /// The arguments did not fit the handler's arity or expected types
    InvalidArguments,
    /// A pre- or post-dispatch hook aborted the call
    HookError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::NotFound => "NotFound",
            FailureKind::HandlerError => "HandlerError",
            FailureKind::InvalidArguments => "InvalidArguments",
            FailureKind::HookError => "HookError",
        };
        f.write_str(s)
    }
}

/// A failure descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    /// The failure category
    pub kind: FailureKind,
    /// Human-readable description of what went wrong
    pub message: String,
}

impl Failure {
    /// Creates a failure of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The outcome of one dispatch.
///
/// Serializes as `{"status": "success", "data": <value>}` or
/// `{"status": "failure", "data": {"kind": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum InvocationResult {
    /// The handler completed; contains its payload
    Success(Value),
    /// The dispatch failed; contains the failure descriptor
    Failure(Failure),
}

impl InvocationResult {
    /// Creates a failure result.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        InvocationResult::Failure(Failure::new(kind, message))
    }

    /// Returns true if the dispatch succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success(_))
    }

    /// Returns true if the dispatch failed.
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Returns the success payload, or None for failures.
    pub fn value(&self) -> Option<&Value> {
        match self {
            InvocationResult::Success(v) => Some(v),
            InvocationResult::Failure(_) => None,
        }
    }

    /// Returns the failure descriptor, or None for successes.
    pub fn failure_info(&self) -> Option<&Failure> {
        match self {
            InvocationResult::Success(_) => None,
            InvocationResult::Failure(f) => Some(f),
        }
    }

    /// Returns the failure kind, or None for successes.
    pub fn kind(&self) -> Option<FailureKind> {
        self.failure_info().map(|f| f.kind)
    }

    /// Returns the failure message, or None for successes.
    pub fn message(&self) -> Option<&str> {
        self.failure_info().map(|f| f.message.as_str())
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<Value, Failure> {
        match self {
            InvocationResult::Success(v) => Ok(v),
            InvocationResult::Failure(f) => Err(f),
        }
    }
}

impl From<Failure> for InvocationResult {
    fn from(failure: Failure) -> Self {
        InvocationResult::Failure(failure)
    }
}

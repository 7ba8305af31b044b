//! Output mode control.
//!
//! [`OutputMode`] determines how an [`InvocationResult`] is presented, from
//! plain text for terminals to structured data for scripts.

use serde_json::Value;

use crate::result::InvocationResult;
use crate::serialize::{serialize_structured, SerializeError};

/// Controls how results are rendered.
///
/// This is the user-facing enum for the `--output` CLI flag.
///
/// # Variants
///
/// - `Text` - The payload itself (strings unquoted) or `Kind: message`
/// - `Json`, `Yaml` - Serialize the whole result, status included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-readable text
    #[default]
    Text,
    /// Serialize the result as JSON
    Json,
    /// Serialize the result as YAML
    Yaml,
}

impl OutputMode {
    /// Returns true if this is a structured output mode (JSON, YAML).
    pub fn is_structured(&self) -> bool {
        matches!(self, OutputMode::Json | OutputMode::Yaml)
    }
}

/// Renders a result in the given mode.
pub fn render_result(
    result: &InvocationResult,
    mode: OutputMode,
) -> Result<String, SerializeError> {
    if mode.is_structured() {
        return serialize_structured(result, mode);
    }

    Ok(match result {
        InvocationResult::Success(value) => value_to_text(value),
        InvocationResult::Failure(failure) => failure.to_string(),
    })
}

/// Formats a payload for text output.
///
/// Strings print without quotes and `null` prints as nothing; everything
/// else prints as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

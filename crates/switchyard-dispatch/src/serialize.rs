//! Structured data serialization.
//!
//! Handles JSON and YAML serialization of dispatch results.

use crate::OutputMode;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Not a structured output mode")]
    NotStructured,
}

/// Serializes data to the specified structured format.
///
/// Returns an error if the output mode is not a structured mode.
pub fn serialize_structured<T: Serialize>(
    data: &T,
    mode: OutputMode,
) -> Result<String, SerializeError> {
    match mode {
        OutputMode::Json => to_json(data),
        OutputMode::Yaml => to_yaml(data),
        OutputMode::Text => Err(SerializeError::NotStructured),
    }
}

/// Serializes data to pretty-printed JSON.
pub fn to_json<T: Serialize>(data: &T) -> Result<String, SerializeError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Serializes data to single-line JSON.
pub fn to_json_line<T: Serialize>(data: &T) -> Result<String, SerializeError> {
    Ok(serde_json::to_string(data)?)
}

/// Serializes data to YAML format.
pub fn to_yaml<T: Serialize>(data: &T) -> Result<String, SerializeError> {
    Ok(serde_yaml::to_string(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_json() {
        let data = json!({"name": "test", "value": 42});
        let out = serialize_structured(&data, OutputMode::Json).unwrap();
        assert!(out.contains("\"name\": \"test\""));
        assert!(out.contains("\"value\": 42"));
    }

    #[test]
    fn test_serialize_json_line() {
        let data = json!({"a": [1, 2]});
        assert_eq!(to_json_line(&data).unwrap(), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_serialize_yaml() {
        let data = json!({"name": "test", "value": 42});
        let out = serialize_structured(&data, OutputMode::Yaml).unwrap();
        assert!(out.contains("name: test"));
        assert!(out.contains("value: 42"));
    }

    #[test]
    fn test_serialize_text_is_not_structured() {
        let err = serialize_structured(&json!(1), OutputMode::Text).unwrap_err();
        assert!(matches!(err, SerializeError::NotStructured));
    }
}

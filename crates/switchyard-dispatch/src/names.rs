//! Handler name utilities.
//!
//! Handler names are dot-separated paths: `math.add` names the `add` handler
//! inside the `math` group. Groups build names by joining a prefix and a
//! local name.

use crate::registry::RegistryError;

/// Checks that `name` is a well-formed handler name.
///
/// A valid name is non-empty, contains no whitespace and has no empty
/// segments, so `"math.add"` is valid while `".add"`, `"math..add"` and
/// `"math add"` are not.
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.chars().any(char::is_whitespace) {
        Some("name contains whitespace")
    } else if name.split('.').any(str::is_empty) {
        Some("name has an empty segment")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RegistryError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Joins a group prefix and a local name.
///
/// For example, `("math", "add")` becomes `"math.add"`. An empty prefix
/// yields the name unchanged.
pub fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Splits a dot-separated name into its segments.
///
/// For example, `"math.add"` becomes `["math", "add"]`.
pub fn split_name(name: &str) -> Vec<String> {
    if name.is_empty() {
        Vec::new()
    } else {
        name.split('.').map(String::from).collect()
    }
}

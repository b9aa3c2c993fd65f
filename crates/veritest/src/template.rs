//! Placeholder substitution for `${NAME}` / `{NAME}` tokens.
//!
//! Variables only apply inside string leaves; objects and arrays are walked
//! recursively (object keys are never substituted). A string that consists of
//! exactly one placeholder resolves to the variable's original typed value,
//! which is how numbers, booleans, and nested structures flow through
//! templated fields. Substitution is single-pass: text inserted by a
//! substitution is never re-scanned for placeholders.

use crate::variables::VariableStore;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// Matches `${NAME}` and `{NAME}` tokens. Names may contain dots so that
/// dot-flattened variables (`user.address.city`) stay addressable.
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\$\{([A-Za-z0-9_][A-Za-z0-9_.-]*)\}|\{([A-Za-z0-9_][A-Za-z0-9_.-]*)\}")
        .expect("placeholder regex must compile")
});

/// Canonical textual form of a value for in-string substitution.
///
/// Strings are inserted verbatim (no quotes); everything else uses its
/// compact JSON rendering.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// If `input` is exactly one placeholder token, return the variable name.
fn whole_placeholder(input: &str) -> Option<&str> {
    let inner = input
        .strip_prefix("${")
        .or_else(|| input.strip_prefix('{'))?;
    let name = inner.strip_suffix('}')?;
    if name.is_empty() || name.contains('{') || name.contains('}') {
        return None;
    }
    Some(name)
}

/// Resolve placeholders inside a single string.
///
/// Returns the variable's typed value when the whole string is one known
/// placeholder; otherwise replaces every known placeholder occurrence with
/// its string form. Unknown placeholders are left verbatim.
pub fn resolve_str(input: &str, variables: &VariableStore) -> Value {
    if let Some(name) = whole_placeholder(input) {
        if let Some(value) = variables.get(name) {
            return value.clone();
        }
    }

    let replaced = PLACEHOLDER_REGEX.replace_all(input, |caps: &Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match variables.get(name) {
            Some(value) => stringify(value),
            // Unknown placeholder: keep the original token
            None => caps[0].to_string(),
        }
    });
    Value::String(replaced.into_owned())
}

/// Recursively resolve placeholders in a value tree.
///
/// Non-string leaves are returned unchanged; objects are walked key-wise and
/// arrays index-wise.
pub fn resolve_value(value: &Value, variables: &VariableStore) -> Value {
    match value {
        Value::String(s) => resolve_str(s, variables),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, variables)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items.iter().map(|v| resolve_value(v, variables)).collect(),
        ),
        other => other.clone(),
    }
}

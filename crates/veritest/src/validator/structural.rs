//! Recursive structural validation of response bodies.
//!
//! Expected scalars compare literally unless they carry a `pattern:<name>`
//! or `regex:<expr>` prefix; numeric actual values are stringified before
//! pattern checks. An expected list is a template: its first element is
//! applied to every element of the actual list (length is never compared,
//! but an empty actual list against a non-empty template fails).

use crate::error::{ErrorKind, TestFailure};
use crate::pattern;
use crate::template::stringify;
use serde_json::Value;

pub type ValidationOutcome = Result<(), TestFailure>;

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Validate `actual` against an arbitrary expected value.
pub fn validate_structure(actual: &Value, expected: &Value) -> ValidationOutcome {
    match expected {
        Value::Object(expected_map) => validate_object(actual, expected_map),
        Value::Array(expected_items) => validate_list(actual, expected_items),
        scalar => check_scalar(actual, scalar, "value"),
    }
}

/// Validate every expected key against the actual object. Extra keys in the
/// actual object are ignored.
pub fn validate_object(
    actual: &Value,
    expected: &serde_json::Map<String, Value>,
) -> ValidationOutcome {
    let Value::Object(actual_map) = actual else {
        return Err(TestFailure::new(
            ErrorKind::IncorrectValue,
            format!("Type mismatch. Expected object, got {}", type_name(actual)),
        ));
    };

    for (key, expected_value) in expected {
        let Some(actual_value) = actual_map.get(key) else {
            return Err(TestFailure::new(
                ErrorKind::MissingKey,
                format!("Missing key: {}", key),
            ));
        };

        match expected_value {
            Value::Object(inner) => {
                if !actual_value.is_object() {
                    return Err(TestFailure::new(
                        ErrorKind::IncorrectValue,
                        format!(
                            "Type mismatch for key {}. Expected object, got {}",
                            key,
                            type_name(actual_value)
                        ),
                    ));
                }
                validate_object(actual_value, inner).map_err(|f| f.in_key(key))?;
            }
            Value::Array(inner) => {
                if !actual_value.is_array() {
                    return Err(TestFailure::new(
                        ErrorKind::IncorrectValue,
                        format!(
                            "Type mismatch for key {}. Expected list, got {}",
                            key,
                            type_name(actual_value)
                        ),
                    ));
                }
                validate_list(actual_value, inner).map_err(|f| f.in_key(key))?;
            }
            scalar => check_scalar(actual_value, scalar, &format!("key {}", key))?,
        }
    }
    Ok(())
}

/// List-template validation: an empty expected list is a wildcard; otherwise
/// the first expected element validates every actual element independently.
pub fn validate_list(actual: &Value, expected: &[Value]) -> ValidationOutcome {
    if expected.is_empty() {
        return Ok(());
    }
    let Value::Array(actual_items) = actual else {
        return Err(TestFailure::new(
            ErrorKind::IncorrectValue,
            format!("Type mismatch. Expected list, got {}", type_name(actual)),
        ));
    };
    if actual_items.is_empty() {
        return Err(TestFailure::new(ErrorKind::IncorrectValue, "Empty list"));
    }

    let template = &expected[0];
    for (index, actual_value) in actual_items.iter().enumerate() {
        match template {
            Value::Object(inner) => {
                validate_object(actual_value, inner).map_err(|f| f.in_element(index))?;
            }
            Value::Array(inner) => {
                validate_list(actual_value, inner).map_err(|f| f.in_element(index))?;
            }
            scalar => check_scalar(actual_value, scalar, &format!("element {}", index))?,
        }
    }
    Ok(())
}

/// Compare one actual value against an expected scalar, honoring the
/// `pattern:` and `regex:` prefixes. `context` names the location for
/// failure messages (`key id`, `element 2`, ...).
pub fn check_scalar(actual: &Value, expected: &Value, context: &str) -> ValidationOutcome {
    if let Value::String(expected_str) = expected {
        if let Some(pattern_name) = expected_str.strip_prefix("pattern:") {
            return check_pattern(actual, pattern_name, context, |value| {
                pattern::validate_pattern(pattern_name, value)
            })
            .map_err(|f| rename_check(f, "Pattern"));
        }
        if let Some(expr) = expected_str.strip_prefix("regex:") {
            return check_pattern(actual, expr, context, |value| {
                pattern::validate_regex(expr, value)
            })
            .map_err(|f| rename_check(f, "Regex"));
        }
    }

    if actual == expected {
        Ok(())
    } else {
        Err(TestFailure::new(
            ErrorKind::IncorrectValue,
            format!(
                "Value mismatch for {}. Expected: {}, Actual: {}",
                context,
                stringify(expected),
                stringify(actual)
            ),
        ))
    }
}

/// Numeric actual values are stringified before pattern checks; any other
/// non-string type cannot match a pattern.
fn check_pattern<F>(actual: &Value, _selector: &str, context: &str, matcher: F) -> ValidationOutcome
where
    F: FnOnce(&str) -> Result<bool, pattern::PatternError>,
{
    let coerced = match actual {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    let Some(value) = coerced else {
        return Err(TestFailure::new(
            ErrorKind::PatternDoNotMatch,
            format!(
                "Pattern validation failed for {}. Value: {}",
                context,
                stringify(actual)
            ),
        ));
    };
    match matcher(&value) {
        Ok(true) => Ok(()),
        Ok(false) => Err(TestFailure::new(
            ErrorKind::PatternDoNotMatch,
            format!("Pattern validation failed for {}. Value: {}", context, value),
        )),
        Err(err) => Err(TestFailure::new(
            ErrorKind::PatternDoNotMatch,
            format!("Pattern validation failed for {}: {}", context, err),
        )),
    }
}

/// Adjusts the failure message to say `Regex validation failed` for raw
/// regex checks while keeping a single check implementation.
fn rename_check(failure: TestFailure, label: &str) -> TestFailure {
    TestFailure {
        kind: failure.kind,
        message: failure
            .message
            .replacen("Pattern validation", &format!("{} validation", label), 1),
    }
}

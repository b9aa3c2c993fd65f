//! Named regular-expression matchers usable via `pattern:<name>` in expected
//! values, plus raw-regex matching for `regex:<expr>`.
//!
//! Raw regexes follow match-at-start semantics: the expression must match a
//! prefix of the value unless it is explicitly anchored elsewhere. The named
//! patterns are all fully anchored.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Unknown pattern: {0}")]
    UnknownPattern(String),
    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

/// Compiled named-pattern table, built once per process.
static PATTERNS: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    let entries: &[(&str, &str)] = &[
        // At least 2 characters: letters, spaces, apostrophes, or hyphens
        ("name", r"^[A-Za-z\s'-]{2,}$"),
        ("integer", r"^-?\d+$"),
        ("float", r"^-?\d+(\.\d+)?$"),
        ("date_mm_dd_yy", r"^(0[1-9]|1[0-2])/(0[1-9]|[12]\d|3[01])/\d{2}$"),
        ("date_yyyy_mm_dd", r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$"),
        ("time_24hour", r"^(?:[01]\d|2[0-3]):[0-5]\d$"),
        ("time_12hour", r"^(?:0?[1-9]|1[0-2]):[0-5]\d\s*(?:AM|PM|am|pm)$"),
        ("email", r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[A-Za-z]{2,}$"),
        (
            "uuid",
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
        ),
        ("phone_us", r"^(?:\+?1[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}$"),
        ("url", r"^(?:https?://)?[\w.-]+(?:/[\w.-]*)*/?$"),
        ("ipv4", r"^(?:\d{1,3}\.){3}\d{1,3}$"),
        ("ipv6", r"^([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}$"),
        (
            "credit_card",
            r"^(?:4[0-9]{12}(?:[0-9]{3})?|5[1-5][0-9]{14}|6(?:011|5[0-9][0-9])[0-9]{12}|3[47][0-9]{13}|3(?:0[0-5]|[68][0-9])[0-9]{11}|(?:2131|1800|35\d{3})\d{11})$",
        ),
        ("alpha", r"^[A-Za-z]+$"),
        ("alphanumeric", r"^[A-Za-z0-9]+$"),
        ("alphanumeric_special", r"^[A-Za-z0-9!@#$%^&*()_+=-]+$"),
    ];
    entries
        .iter()
        .map(|(name, pattern)| {
            // Static table: a malformed entry is a programming error
            #[allow(clippy::expect_used)]
            (*name, Regex::new(pattern).expect("built-in pattern must compile"))
        })
        .collect()
});

/// Validate a value against a named built-in pattern.
pub fn validate_pattern(pattern_name: &str, value: &str) -> Result<bool, PatternError> {
    let regex = PATTERNS
        .get(pattern_name)
        .ok_or_else(|| PatternError::UnknownPattern(pattern_name.to_string()))?;
    Ok(regex.is_match(value))
}

/// Validate a value against a raw regex, requiring a match at the start of
/// the value.
pub fn validate_regex(pattern: &str, value: &str) -> Result<bool, PatternError> {
    let regex = Regex::new(pattern).map_err(|source| PatternError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(regex.find(value).is_some_and(|m| m.start() == 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_patterns_match() {
        assert!(validate_pattern("email", "jane.doe@example.com").unwrap());
        assert!(!validate_pattern("email", "not-an-email").unwrap());

        assert!(validate_pattern("uuid", "123e4567-e89b-12d3-a456-426614174000").unwrap());
        assert!(!validate_pattern("uuid", "123e4567").unwrap());

        assert!(validate_pattern("alpha", "John").unwrap());
        assert!(!validate_pattern("alpha", "J0hn").unwrap());

        assert!(validate_pattern("integer", "-42").unwrap());
        assert!(!validate_pattern("integer", "4.2").unwrap());

        assert!(validate_pattern("date_yyyy_mm_dd", "2024-02-29").unwrap());
        assert!(!validate_pattern("date_yyyy_mm_dd", "2024-13-01").unwrap());

        assert!(validate_pattern("ipv4", "10.0.0.1").unwrap());
        assert!(validate_pattern("phone_us", "(555) 123-4567").unwrap());
    }

    #[test]
    fn unknown_pattern_is_an_error() {
        assert!(matches!(
            validate_pattern("nope", "x"),
            Err(PatternError::UnknownPattern(_))
        ));
    }

    #[test]
    fn raw_regex_matches_at_start() {
        assert!(validate_regex(r"\d+", "123abc").unwrap());
        assert!(!validate_regex(r"\d+", "abc123").unwrap());
        assert!(validate_regex(r"^user-\d+$", "user-7").unwrap());
    }

    #[test]
    fn invalid_regex_is_an_error() {
        assert!(matches!(
            validate_regex("(unclosed", "x"),
            Err(PatternError::InvalidRegex { .. })
        ));
    }
}

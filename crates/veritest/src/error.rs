//! Error-kind tags and failure records shared across the engine.
//!
//! Validators and executors never panic or propagate raw errors past their
//! boundary: they produce a [`TestFailure`] value carrying a stable kind tag
//! plus a human-readable message. The per-case runner is the single place
//! that converts unexpected `Err` values into a failed result.

use std::fmt;

/// Stable error-kind tags surfaced in result records.
///
/// Rendered in SCREAMING_SNAKE_CASE so downstream report tooling can match
/// on them without parsing the rest of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A script precondition exited nonzero.
    PreconditionScriptFailed,
    /// A script precondition printed something other than one JSON object.
    PreconditionScriptJsonError,
    /// Response status code differed from `expected_status`.
    ExpectedStatusMismatch,
    /// JSON Schema validation rejected the response body.
    SchemaValidationFailure,
    /// A `pattern:`/`regex:` expectation did not match the actual value.
    PatternDoNotMatch,
    /// An expected key was absent from the actual response.
    MissingKey,
    /// An actual value differed from the expected literal (or had the wrong type).
    IncorrectValue,
    /// Catch-all for unexpected failures (network errors, bad suite data, timeouts).
    TestExecutionError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PreconditionScriptFailed => "PRECONDITION_SCRIPT_FAILED",
            ErrorKind::PreconditionScriptJsonError => "PRECONDITION_SCRIPT_JSON_ERROR",
            ErrorKind::ExpectedStatusMismatch => "EXPECTED_STATUS_MISMATCH",
            ErrorKind::SchemaValidationFailure => "SCHEMA_VALIDATION_FAILURE",
            ErrorKind::PatternDoNotMatch => "PATTERN_DO_NOT_MATCH",
            ErrorKind::MissingKey => "MISSING_KEY",
            ErrorKind::IncorrectValue => "INCORRECT_VALUE",
            ErrorKind::TestExecutionError => "TEST_EXECUTION_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged, human-readable failure for one test case.
///
/// Nested validation failures accumulate a breadcrumb prefix in `message`
/// (e.g. `In key orders: In element 2: ...`) while the kind of the innermost
/// mismatch is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl TestFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        TestFailure {
            kind,
            message: message.into(),
        }
    }

    /// Prefix the message with a key breadcrumb, keeping the inner kind.
    pub fn in_key(self, key: &str) -> Self {
        TestFailure {
            kind: self.kind,
            message: format!("In key {}: {}", key, self.message),
        }
    }

    /// Prefix the message with a list-element breadcrumb, keeping the inner kind.
    pub fn in_element(self, index: usize) -> Self {
        TestFailure {
            kind: self.kind,
            message: format!("In element {}: {}", index, self.message),
        }
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.kind, self.message)
    }
}

impl std::error::Error for TestFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(
            ErrorKind::PreconditionScriptFailed.to_string(),
            "PRECONDITION_SCRIPT_FAILED"
        );
        assert_eq!(ErrorKind::PatternDoNotMatch.to_string(), "PATTERN_DO_NOT_MATCH");
        assert_eq!(ErrorKind::MissingKey.to_string(), "MISSING_KEY");
    }

    #[test]
    fn breadcrumbs_wrap_message_and_keep_kind() {
        let failure = TestFailure::new(ErrorKind::IncorrectValue, "Value mismatch for key id")
            .in_element(2)
            .in_key("orders");
        assert_eq!(failure.kind, ErrorKind::IncorrectValue);
        assert_eq!(
            failure.to_string(),
            "INCORRECT_VALUE : In key orders: In element 2: Value mismatch for key id"
        );
    }
}

//! Response validation: a state machine over the test case's validation mode.
//!
//! Precedence: a declared schema reference runs schema validation and fully
//! determines the result, regardless of `validation_mode`. Otherwise the
//! mode dispatches to structural validation (`full`/`partial`) or to a
//! single-value check at `validation_path` (`specific`).

pub mod schema;
pub mod structural;

pub use schema::{LocalSchemaProvider, SchemaError, SchemaProvider};
pub use structural::{check_scalar, validate_list, validate_object, validate_structure};

use crate::config::{TestCase, ValidationMode};
use crate::error::{ErrorKind, TestFailure};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Validates response bodies for test cases.
#[derive(Clone)]
pub struct ResponseValidator {
    schema_provider: Arc<dyn SchemaProvider>,
}

impl ResponseValidator {
    pub fn new(schema_provider: Arc<dyn SchemaProvider>) -> Self {
        ResponseValidator { schema_provider }
    }

    /// Validator backed by the local-file schema provider.
    pub fn with_local_schemas() -> Self {
        Self::new(Arc::new(LocalSchemaProvider))
    }

    /// Validate `response` for `case`. `expected` is the test case's
    /// expected-response value with variables already resolved (an empty
    /// object when the case declares none).
    pub async fn validate_response(
        &self,
        response: &Value,
        case: &TestCase,
        expected: &Value,
    ) -> Result<(), TestFailure> {
        if let Some(spec) = &case.schema {
            debug!(case = %case.name, "schema reference present, schema validation decides");
            let schema = self.schema_provider.resolve(spec).await.map_err(|e| {
                TestFailure::new(ErrorKind::SchemaValidationFailure, e.to_string())
            })?;
            return schema::validate_document(response, &schema);
        }

        match case.validation_mode {
            ValidationMode::Specific => {
                let segments = case
                    .validation_path
                    .as_ref()
                    .map(|path| path.segments())
                    .unwrap_or_default();
                validate_specific(response, expected, &segments)
            }
            ValidationMode::Full | ValidationMode::Partial => {
                validate_structure(response, expected)
            }
        }
    }
}

/// Navigate `segments` through the response and compare only the resulting
/// value against `expected`.
fn validate_specific(
    response: &Value,
    expected: &Value,
    segments: &[String],
) -> Result<(), TestFailure> {
    let path_display = segments.join(".");
    let mut current = response;
    for key in segments {
        let Value::Object(map) = current else {
            return Err(TestFailure::new(
                ErrorKind::IncorrectValue,
                format!(
                    "Invalid path: {}. Current value is not an object",
                    path_display
                ),
            ));
        };
        current = map.get(key).ok_or_else(|| {
            TestFailure::new(
                ErrorKind::MissingKey,
                format!("Invalid path: {}. Key {} not found", path_display, key),
            )
        })?;
    }
    let context = if path_display.is_empty() {
        "value".to_string()
    } else {
        format!("path {}", path_display)
    };
    check_scalar(current, expected, &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn case(yaml: &str) -> TestCase {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn full_mode_validates_structure() {
        let validator = ResponseValidator::with_local_schemas();
        let case = case("name: t");
        let response = json!({"id": 1, "name": "John"});
        let expected = json!({"id": 1, "name": "pattern:alpha"});
        assert!(validator
            .validate_response(&response, &case, &expected)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn full_mode_dispatches_lists_to_template_validation() {
        let validator = ResponseValidator::with_local_schemas();
        let case = case("name: t");
        let response = json!([{"id": 1}, {"id": 2}]);
        let expected = json!([{"id": "pattern:integer"}]);
        assert!(validator
            .validate_response(&response, &case, &expected)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn partial_mode_ignores_extra_keys() {
        let validator = ResponseValidator::with_local_schemas();
        let case = case("name: t\nvalidation_mode: partial");
        let response = json!({"a": 1, "b": 2});
        assert!(validator
            .validate_response(&response, &case, &json!({"a": 1}))
            .await
            .is_ok());

        let failure = validator
            .validate_response(&response, &case, &json!({"a": 2}))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, ErrorKind::IncorrectValue);
    }

    #[tokio::test]
    async fn specific_mode_checks_only_the_addressed_value() {
        let validator = ResponseValidator::with_local_schemas();
        let response = json!({"data": {"user": {"id": 9, "name": "wrong-elsewhere"}}});

        let dotted = case("name: t\nvalidation_mode: specific\nvalidation_path: data.user.id");
        assert!(validator
            .validate_response(&response, &dotted, &json!(9))
            .await
            .is_ok());

        let listed =
            case("name: t\nvalidation_mode: specific\nvalidation_path: [data, user, id]");
        assert!(validator
            .validate_response(&response, &listed, &json!(9))
            .await
            .is_ok());

        let failure = validator
            .validate_response(&response, &dotted, &json!(10))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, ErrorKind::IncorrectValue);
    }

    #[tokio::test]
    async fn specific_mode_reports_bad_paths() {
        let validator = ResponseValidator::with_local_schemas();
        let response = json!({"data": {"user": 5}});

        let missing = case("name: t\nvalidation_mode: specific\nvalidation_path: data.nope");
        let failure = validator
            .validate_response(&response, &missing, &json!(1))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, ErrorKind::MissingKey);

        let through_scalar =
            case("name: t\nvalidation_mode: specific\nvalidation_path: data.user.id");
        let failure = validator
            .validate_response(&response, &through_scalar, &json!(1))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, ErrorKind::IncorrectValue);
    }

    #[tokio::test]
    async fn schema_reference_overrides_validation_mode() {
        let mut schema_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            schema_file,
            r#"{{"type": "object", "required": ["id"], "properties": {{"id": {{"type": "integer"}}}}}}"#
        )
        .unwrap();

        let yaml = format!(
            "name: t\nschema: {}\nexpected_response:\n  id: 999",
            schema_file.path().display()
        );
        let case = case(&yaml);
        let validator = ResponseValidator::with_local_schemas();

        // expected_response says id must be 999, but the schema accepts any
        // integer id: schema wins.
        let response = json!({"id": 1});
        assert!(validator
            .validate_response(&response, &case, &json!({"id": 999}))
            .await
            .is_ok());

        // And a schema violation fails even though expected_response matches.
        let response = json!({"id": "not-an-integer"});
        let failure = validator
            .validate_response(&response, &case, &json!({"id": "not-an-integer"}))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, ErrorKind::SchemaValidationFailure);
    }

    #[tokio::test]
    async fn unresolvable_schema_is_a_schema_failure() {
        let case = case("name: t\nschema: /missing/schema.json");
        let validator = ResponseValidator::with_local_schemas();
        let failure = validator
            .validate_response(&json!({}), &case, &json!({}))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, ErrorKind::SchemaValidationFailure);
        assert!(failure.message.contains("Schema file not found"));
    }
}

//! Suite definition types loaded from YAML.
//!
//! A suite file is either a mapping with optional `base_url`, `tags`,
//! `testData`, and a `test_cases` list, or a bare list of test cases (in
//! which case there are no file-level tags or shared variables). Suites are
//! immutable after load.

use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Top-level suite document: full mapping or bare test-case list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SuiteDocument {
    Suite(TestSuite),
    Cases(Vec<TestCase>),
}

/// A loaded test suite file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TestSuite {
    /// Overrides the runner's base URL for every case in this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// File-level tags, unioned with each case's own tags during filtering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Shared variable block. One level of nesting is flattened with
    /// camelCase joining (`user: {name: x}` becomes `userName`).
    #[serde(default, rename = "testData", skip_serializing_if = "Option::is_none")]
    pub test_data: Option<IndexMap<String, Value>>,

    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read suite file {}", path.display()))?;
        let document: SuiteDocument = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse suite file {}", path.display()))?;
        Ok(match document {
            SuiteDocument::Suite(suite) => suite,
            SuiteDocument::Cases(test_cases) => TestSuite {
                test_cases,
                ..TestSuite::default()
            },
        })
    }

    /// Suite-level variables derived from `testData`, with one nesting level
    /// flattened via camelCase joining.
    pub fn variables(&self) -> IndexMap<String, Value> {
        let mut variables = IndexMap::new();
        let Some(test_data) = &self.test_data else {
            return variables;
        };
        for (name, value) in test_data {
            match value {
                Value::Object(fields) => {
                    for (sub_name, sub_value) in fields {
                        variables.insert(camel_join(name, sub_name), sub_value.clone());
                    }
                }
                bare => {
                    variables.insert(name.clone(), bare.clone());
                }
            }
        }
        variables
    }
}

fn camel_join(parent: &str, child: &str) -> String {
    let mut chars = child.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", parent, first.to_uppercase(), chars.as_str()),
        None => parent.to_string(),
    }
}

/// One declarative test case.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestCase {
    /// Unique key within the suite's result map (last write wins on clashes).
    pub name: String,

    /// Relative URL, joined against the effective base URL.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, Value>,

    /// Request body, accepted as `data` or `body`.
    #[serde(default, alias = "body", skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Setup steps executed strictly in order before the main request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<Precondition>,

    /// Variable name -> dot-path into the main response body.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extract_variables: IndexMap<String, String>,

    #[serde(default = "default_expected_status")]
    pub expected_status: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<Value>,

    /// When present, schema validation fully determines the result,
    /// regardless of `validation_mode`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaSpec>,

    #[serde(default)]
    pub validation_mode: ValidationMode,

    /// Only consulted in `specific` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_path: Option<ValidationPath>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Per-case deadline override (seconds) for HTTP calls and scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_expected_status() -> u16 {
    200
}

/// HTTP method for a test case or precondition step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum HttpMethod {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    OPTIONS,
    HEAD,
}

impl HttpMethod {
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::DELETE => reqwest::Method::DELETE,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
            HttpMethod::HEAD => reqwest::Method::HEAD,
        }
    }
}

/// A setup step: external script invocation or auxiliary HTTP call.
///
/// Untagged: the `Script` variant is tried first, so any mapping with a
/// `script` key is a script step.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Precondition {
    Script(ScriptPrecondition),
    Http(HttpPrecondition),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptPrecondition {
    pub script: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HttpPrecondition {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, Value>,
    #[serde(default, alias = "body", skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extract_variables: IndexMap<String, String>,
}

/// Schema reference: bare file path, or a structured spec that loads a
/// pre-generated target file and otherwise defers to a generator provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SchemaSpec {
    Path(PathBuf),
    Generated(GeneratedSchema),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratedSchema {
    /// Source type-definition file handed to the generator.
    pub file: PathBuf,
    /// Root type name within `file`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Where the generated schema is (or should be) stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
}

/// Response-matching strategy (ignored when `schema` is set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Full,
    Partial,
    Specific,
}

/// Path for `specific` mode: a key list or a single dot-delimited string.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ValidationPath {
    Keys(Vec<String>),
    Dotted(String),
}

impl ValidationPath {
    pub fn segments(&self) -> Vec<String> {
        match self {
            ValidationPath::Keys(keys) => keys.clone(),
            ValidationPath::Dotted(path) => path.split('.').map(str::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_suite_document() {
        let yaml = r#"
base_url: http://localhost:5000
tags: [smoke]
testData:
  token: abc
  user:
    name: Jane
    id: 3
test_cases:
  - name: get user
    url: /users/1
    expected_status: 200
    expected_response:
      id: 1
"#;
        let suite: TestSuite = match serde_yaml::from_str::<TestSuite>(yaml) {
            Ok(suite) => suite,
            Err(err) => panic!("parse failed: {err}"),
        };
        assert_eq!(suite.base_url.as_deref(), Some("http://localhost:5000"));
        assert_eq!(suite.tags, vec!["smoke"]);
        assert_eq!(suite.test_cases.len(), 1);
        assert_eq!(suite.test_cases[0].name, "get user");
        assert_eq!(suite.test_cases[0].method, HttpMethod::GET);
        assert_eq!(suite.test_cases[0].expected_status, 200);
    }

    #[test]
    fn bare_list_document_has_no_file_tags() {
        let yaml = r#"
- name: a
  url: /a
- name: b
  url: /b
  method: POST
"#;
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), yaml).unwrap();
        let suite = TestSuite::from_file(file.path()).unwrap();
        assert!(suite.tags.is_empty());
        assert!(suite.base_url.is_none());
        assert_eq!(suite.test_cases.len(), 2);
        assert_eq!(suite.test_cases[1].method, HttpMethod::POST);
    }

    #[test]
    fn test_data_flattens_one_level_camel_joined() {
        let yaml = r#"
testData:
  token: abc
  user:
    name: Jane
    addressCity: Oslo
test_cases: []
"#;
        let suite: TestSuite = serde_yaml::from_str(yaml).unwrap();
        let vars = suite.variables();
        assert_eq!(vars.get("token"), Some(&json!("abc")));
        assert_eq!(vars.get("userName"), Some(&json!("Jane")));
        assert_eq!(vars.get("userAddressCity"), Some(&json!("Oslo")));
        assert!(vars.get("user").is_none());
    }

    #[test]
    fn precondition_variants_deserialize() {
        let yaml = r#"
name: with preconditions
preconditions:
  - script: scripts/setup_user.sh
    args: ["--name", "Temp"]
  - url: /login
    method: POST
    data:
      user: admin
    extract_variables:
      token: auth.token
"#;
        let case: TestCase = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(case.preconditions.len(), 2);
        assert!(matches!(case.preconditions[0], Precondition::Script(_)));
        match &case.preconditions[1] {
            Precondition::Http(http) => {
                assert_eq!(http.url, "/login");
                assert_eq!(http.method, HttpMethod::POST);
                assert_eq!(http.extract_variables.get("token").unwrap(), "auth.token");
            }
            Precondition::Script(_) => panic!("expected HTTP precondition"),
        }
    }

    #[test]
    fn body_alias_and_data_both_accepted() {
        let with_data: TestCase = serde_yaml::from_str("name: a\ndata: {x: 1}").unwrap();
        let with_body: TestCase = serde_yaml::from_str("name: b\nbody: {x: 1}").unwrap();
        assert_eq!(with_data.data, Some(json!({"x": 1})));
        assert_eq!(with_body.data, Some(json!({"x": 1})));
    }

    #[test]
    fn schema_spec_variants_deserialize() {
        let path_form: TestCase =
            serde_yaml::from_str("name: a\nschema: schemas/user.json").unwrap();
        assert!(matches!(path_form.schema, Some(SchemaSpec::Path(_))));

        let structured: TestCase = serde_yaml::from_str(
            "name: b\nschema:\n  file: types/user.js\n  type: User\n  target: schemas/user.json",
        )
        .unwrap();
        match structured.schema {
            Some(SchemaSpec::Generated(generated)) => {
                assert_eq!(generated.type_name, "User");
                assert!(generated.target.is_some());
            }
            other => panic!("expected generated schema spec, got {other:?}"),
        }
    }

    #[test]
    fn validation_path_accepts_list_or_dotted_string() {
        let listed: TestCase =
            serde_yaml::from_str("name: a\nvalidation_path: [data, user, id]").unwrap();
        assert_eq!(
            listed.validation_path.unwrap().segments(),
            vec!["data", "user", "id"]
        );

        let dotted: TestCase =
            serde_yaml::from_str("name: b\nvalidation_path: data.user.id").unwrap();
        assert_eq!(
            dotted.validation_path.unwrap().segments(),
            vec!["data", "user", "id"]
        );
    }

    #[test]
    fn validation_mode_defaults_to_full() {
        let case: TestCase = serde_yaml::from_str("name: a").unwrap();
        assert_eq!(case.validation_mode, ValidationMode::Full);

        let partial: TestCase =
            serde_yaml::from_str("name: a\nvalidation_mode: partial").unwrap();
        assert_eq!(partial.validation_mode, ValidationMode::Partial);
    }
}

//! Suite orchestration: load a suite, filter by tag, run each case in file
//! order, and aggregate named results.
//!
//! Any unexpected failure inside one test case becomes a failed result; it
//! never aborts sibling cases or the suite. Each case gets a freshly built
//! variable store, so cases share no mutable state beyond the read-through
//! common-data cache.


use crate::config::{TestCase, TestSuite};
use crate::error::{ErrorKind, TestFailure};
use crate::exec::{CommandRunner, TokioCommandRunner};
use crate::precondition::{PreconditionError, PreconditionExecutor};
use crate::request::{HttpExchange, RequestError, RequestExecutor};
use crate::template;
use crate::validator::{ResponseValidator, SchemaProvider};
use crate::variables::{CommonDataCache, VariableStore};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Immutable outcome of one test case, keyed by case name in the suite's
/// result map (last write wins when two cases share a name).
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub status: bool,
    pub response: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub request_url: String,
    pub request_headers: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
}

impl TestResult {
    fn passed(exchange: &HttpExchange) -> Self {
        TestResult {
            status: true,
            response: exchange.body.clone(),
            error: None,
            request_url: exchange.request.url.clone(),
            request_headers: exchange.request.headers.clone(),
            request_body: exchange.request.body.clone(),
        }
    }

    fn failed(failure: &TestFailure, exchange: &HttpExchange) -> Self {
        TestResult {
            status: false,
            response: exchange.body.clone(),
            error: Some(failure.to_string()),
            request_url: exchange.request.url.clone(),
            request_headers: exchange.request.headers.clone(),
            request_body: exchange.request.body.clone(),
        }
    }

    /// Failure before any main request was sent (precondition abort).
    fn aborted(failure: &TestFailure) -> Self {
        TestResult {
            status: false,
            response: Value::Object(serde_json::Map::new()),
            error: Some(failure.to_string()),
            request_url: String::new(),
            request_headers: IndexMap::new(),
            request_body: None,
        }
    }

    /// Unexpected failure converted into a failed result.
    fn execution_error(message: &str) -> Self {
        TestResult {
            status: false,
            response: Value::Object(serde_json::Map::new()),
            error: Some(format!("{} : {}", ErrorKind::TestExecutionError, message)),
            request_url: String::new(),
            request_headers: IndexMap::new(),
            request_body: None,
        }
    }
}

/// Result map for one suite, in execution order.
pub type SuiteResults = IndexMap<String, TestResult>;

/// Construction options for [`SuiteRunner`].
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub base_url: Url,
    /// Environment key used to resolve env-scoped common data.
    pub env: String,
    /// Raw `Cookie` header attached to every request.
    pub cookie: Option<String>,
    /// Common JSON test-data file shared across suites.
    pub test_data_file: Option<PathBuf>,
    /// Default deadline for HTTP calls and script preconditions.
    pub timeout: Duration,
}

impl RunnerOptions {
    pub fn new(base_url: Url) -> Self {
        RunnerOptions {
            base_url,
            env: "default".to_string(),
            cookie: None,
            test_data_file: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Runs suites of declarative test cases.
pub struct SuiteRunner {
    env: String,
    test_data_file: Option<PathBuf>,
    default_timeout: Duration,
    http: RequestExecutor,
    command_runner: Arc<dyn CommandRunner>,
    validator: ResponseValidator,
    data_cache: Arc<CommonDataCache>,
}

impl SuiteRunner {
    pub fn new(options: RunnerOptions) -> Result<Self, RequestError> {
        let http = RequestExecutor::new(options.base_url, options.cookie.as_deref())?;
        Ok(SuiteRunner {
            env: options.env,
            test_data_file: options.test_data_file,
            default_timeout: options.timeout,
            http,
            command_runner: Arc::new(TokioCommandRunner),
            validator: ResponseValidator::with_local_schemas(),
            data_cache: Arc::new(CommonDataCache::new()),
        })
    }

    /// Swap the command-runner capability (tests, sandboxed execution).
    pub fn with_command_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.command_runner = runner;
        self
    }

    /// Swap the schema-provider capability.
    pub fn with_schema_provider(mut self, provider: Arc<dyn SchemaProvider>) -> Self {
        self.validator = ResponseValidator::new(provider);
        self
    }

    /// Load and run one suite file. Only the file load itself can fail;
    /// individual test-case failures land in the result map.
    pub async fn run_suite(
        &self,
        path: &Path,
        include_tags: &[String],
    ) -> Result<SuiteResults, anyhow::Error> {
        let suite = TestSuite::from_file(path)?;
        info!(suite = %path.display(), cases = suite.test_cases.len(), "running suite");
        Ok(self.run_loaded_suite(&suite, include_tags).await)
    }

    /// Run an already-loaded suite definition.
    pub async fn run_loaded_suite(
        &self,
        suite: &TestSuite,
        include_tags: &[String],
    ) -> SuiteResults {
        let suite_variables = suite.variables();

        let http = match &suite.base_url {
            Some(base) => match Url::parse(base) {
                Ok(url) => self.http.with_base_url(url),
                Err(err) => {
                    warn!(base_url = %base, %err, "invalid suite base_url, keeping runner default");
                    self.http.clone()
                }
            },
            None => self.http.clone(),
        };

        let mut results = SuiteResults::new();
        for case in filter_by_tags(&suite.test_cases, include_tags, &suite.tags) {
            debug!(case = %case.name, "running test case");
            let result = match self.run_case(case, &suite_variables, &http).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(case = %case.name, %err, "test case failed unexpectedly");
                    TestResult::execution_error(&format!("{:#}", err))
                }
            };
            results.insert(case.name.clone(), result);
        }
        results
    }

    /// One test case: seed variables, run preconditions, issue the request,
    /// check status, extract variables, validate the body.
    async fn run_case(
        &self,
        case: &TestCase,
        suite_variables: &IndexMap<String, Value>,
        http: &RequestExecutor,
    ) -> Result<TestResult, anyhow::Error> {
        let timeout = case
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let common_data = match &self.test_data_file {
            Some(path) => self.data_cache.load(path),
            None => Arc::new(Value::Object(serde_json::Map::new())),
        };
        let mut variables = VariableStore::build(&common_data, &self.env, suite_variables);

        let preconditions = PreconditionExecutor::new(self.command_runner.as_ref(), http, timeout);
        match preconditions.run_all(&case.preconditions, &mut variables).await {
            Ok(()) => {}
            Err(PreconditionError::Failure(failure)) => {
                return Ok(TestResult::aborted(&failure));
            }
            Err(other) => return Err(other.into()),
        }

        let exchange = http
            .execute(
                case.method,
                &case.url,
                &case.headers,
                &case.params,
                case.data.as_ref(),
                &variables,
                timeout,
            )
            .await?;

        if exchange.status != case.expected_status {
            let failure = TestFailure::new(
                ErrorKind::ExpectedStatusMismatch,
                format!("expected {}, got {}", case.expected_status, exchange.status),
            );
            return Ok(TestResult::failed(&failure, &exchange));
        }

        variables.extract(&exchange.body, &case.extract_variables);

        let expected = case
            .expected_response
            .as_ref()
            .map(|value| template::resolve_value(value, &variables))
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        match self
            .validator
            .validate_response(&exchange.body, case, &expected)
            .await
        {
            Ok(()) => Ok(TestResult::passed(&exchange)),
            Err(failure) => Ok(TestResult::failed(&failure, &exchange)),
        }
    }
}

/// A case is included when no tags were requested, or when any of its own
/// tags or the file-level tags intersect the requested set.
fn filter_by_tags<'a>(
    cases: &'a [TestCase],
    include_tags: &[String],
    file_tags: &[String],
) -> Vec<&'a TestCase> {
    if include_tags.is_empty() {
        return cases.iter().collect();
    }
    cases
        .iter()
        .filter(|case| {
            case.tags
                .iter()
                .chain(file_tags.iter())
                .any(|tag| include_tags.contains(tag))
        })
        .collect()
}

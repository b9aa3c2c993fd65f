//! Precondition execution: ordered setup steps run before the main request.
//!
//! A script step must exit 0 and print exactly one JSON object to stdout,
//! which is merged into the variable store; anything else aborts the test
//! case with a tagged failure. An HTTP step never aborts on non-2xx status;
//! only its optional extraction can (silently) fail to populate a variable.

use crate::config::Precondition;
use crate::error::{ErrorKind, TestFailure};
use crate::exec::{CommandError, CommandRunner};
use crate::request::{RequestError, RequestExecutor};
use crate::variables::VariableStore;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Environment variable carrying the suite's base URL into script steps.
pub const BASE_URL_ENV: &str = "API_BASE_URL";

#[derive(Debug, Error)]
pub enum PreconditionError {
    /// Tagged failure that should be reported verbatim on the test result.
    #[error(transparent)]
    Failure(#[from] TestFailure),
    /// Process-level failure (spawn error, deadline exceeded).
    #[error(transparent)]
    Command(#[from] CommandError),
    /// HTTP-step transport failure.
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Runs a test case's preconditions strictly in list order.
pub struct PreconditionExecutor<'a> {
    command_runner: &'a dyn CommandRunner,
    http: &'a RequestExecutor,
    timeout: Duration,
}

impl<'a> PreconditionExecutor<'a> {
    pub fn new(
        command_runner: &'a dyn CommandRunner,
        http: &'a RequestExecutor,
        timeout: Duration,
    ) -> Self {
        PreconditionExecutor {
            command_runner,
            http,
            timeout,
        }
    }

    /// Execute all steps, feeding extracted variables forward. The first
    /// failing step aborts the remainder.
    pub async fn run_all(
        &self,
        preconditions: &[Precondition],
        variables: &mut VariableStore,
    ) -> Result<(), PreconditionError> {
        for step in preconditions {
            match step {
                Precondition::Script(script) => self.run_script(script, variables).await?,
                Precondition::Http(http) => self.run_http(http, variables).await?,
            }
        }
        Ok(())
    }

    async fn run_script(
        &self,
        script: &crate::config::ScriptPrecondition,
        variables: &mut VariableStore,
    ) -> Result<(), PreconditionError> {
        let base_url = self
            .http
            .base_url()
            .as_str()
            .trim_end_matches('/')
            .to_string();
        let env = [(BASE_URL_ENV.to_string(), base_url)];
        let output = self
            .command_runner
            .run(&script.script, &script.args, &env, self.timeout)
            .await?;

        if !output.success() {
            return Err(TestFailure::new(
                ErrorKind::PreconditionScriptFailed,
                output.stderr.trim().to_string(),
            )
            .into());
        }

        let parsed: Value = serde_json::from_str(output.stdout.trim()).map_err(|e| {
            TestFailure::new(ErrorKind::PreconditionScriptJsonError, e.to_string())
        })?;
        let Value::Object(object) = parsed else {
            return Err(TestFailure::new(
                ErrorKind::PreconditionScriptJsonError,
                "script output is not a JSON object",
            )
            .into());
        };
        debug!(script = %script.script.display(), variables = object.len(), "merging script output");
        variables.merge_object(&object);
        Ok(())
    }

    async fn run_http(
        &self,
        step: &crate::config::HttpPrecondition,
        variables: &mut VariableStore,
    ) -> Result<(), PreconditionError> {
        let exchange = self
            .http
            .execute(
                step.method,
                &step.url,
                &step.headers,
                &step.params,
                step.data.as_ref(),
                variables,
                self.timeout,
            )
            .await?;
        // Non-2xx is not fatal here; callers rely on extraction results only.
        debug!(url = %exchange.request.url, status = exchange.status, "precondition request done");
        if !step.extract_variables.is_empty() {
            variables.extract(&exchange.body, &step.extract_variables);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScriptPrecondition;
    use crate::exec::CommandOutput;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};

    /// Command runner double returning a canned outcome.
    struct StubRunner {
        output: CommandOutput,
        seen_env: parking_lot::Mutex<Vec<(String, String)>>,
    }

    impl StubRunner {
        fn new(exit_code: i32, stdout: &str, stderr: &str) -> Self {
            StubRunner {
                output: CommandOutput {
                    exit_code,
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                },
                seen_env: parking_lot::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for StubRunner {
        async fn run(
            &self,
            _program: &Path,
            _args: &[String],
            env: &[(String, String)],
            _timeout: Duration,
        ) -> Result<CommandOutput, CommandError> {
            *self.seen_env.lock() = env.to_vec();
            Ok(self.output.clone())
        }
    }

    fn http() -> RequestExecutor {
        RequestExecutor::new(url::Url::parse("http://localhost:5000").unwrap(), None).unwrap()
    }

    fn script_step() -> Vec<Precondition> {
        vec![Precondition::Script(ScriptPrecondition {
            script: PathBuf::from("setup.sh"),
            args: vec![],
        })]
    }

    #[tokio::test]
    async fn script_output_merges_into_store() {
        let runner = StubRunner::new(0, r#"{"pre_user_id": 5, "pre_user_name": "Temp"}"#, "");
        let http = http();
        let executor = PreconditionExecutor::new(&runner, &http, Duration::from_secs(5));
        let mut variables = VariableStore::new();
        executor.run_all(&script_step(), &mut variables).await.unwrap();
        assert_eq!(variables.get("pre_user_id"), Some(&serde_json::json!(5)));
        assert_eq!(
            variables.get("pre_user_name"),
            Some(&serde_json::json!("Temp"))
        );

        let env = runner.seen_env.lock().clone();
        assert_eq!(
            env,
            vec![(BASE_URL_ENV.to_string(), "http://localhost:5000".to_string())]
        );
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_tagged_failure() {
        let runner = StubRunner::new(1, "", "database unreachable");
        let http = http();
        let executor = PreconditionExecutor::new(&runner, &http, Duration::from_secs(5));
        let mut variables = VariableStore::new();
        let err = executor
            .run_all(&script_step(), &mut variables)
            .await
            .unwrap_err();
        match err {
            PreconditionError::Failure(failure) => {
                assert_eq!(failure.kind, ErrorKind::PreconditionScriptFailed);
                assert!(failure.message.contains("database unreachable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_output_is_a_tagged_failure() {
        let runner = StubRunner::new(0, "not-json", "");
        let http = http();
        let executor = PreconditionExecutor::new(&runner, &http, Duration::from_secs(5));
        let mut variables = VariableStore::new();
        let err = executor
            .run_all(&script_step(), &mut variables)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PreconditionError::Failure(TestFailure {
                kind: ErrorKind::PreconditionScriptJsonError,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn non_object_json_output_is_a_tagged_failure() {
        let runner = StubRunner::new(0, "[1, 2, 3]", "");
        let http = http();
        let executor = PreconditionExecutor::new(&runner, &http, Duration::from_secs(5));
        let mut variables = VariableStore::new();
        let err = executor
            .run_all(&script_step(), &mut variables)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PreconditionError::Failure(TestFailure {
                kind: ErrorKind::PreconditionScriptJsonError,
                ..
            })
        ));
        assert!(variables.is_empty());
    }
}

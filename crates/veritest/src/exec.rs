//! External command runner capability.
//!
//! Script preconditions go through this seam so the engine logic does not
//! depend on a particular process-spawning API, and so tests can substitute
//! a scripted double.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("command {program} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("i/o error while running {program}: {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },
}

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code; -1 when terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external command with arguments and extra environment variables,
/// capturing exit code, stdout, and stderr.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

/// Production command runner backed by `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let program_name = program.display().to_string();
        debug!(program = %program_name, ?args, "running external command");

        let child = tokio::process::Command::new(program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program_name.clone(),
                source,
            })?;

        // Dropping the future on timeout kills the child (kill_on_drop).
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(CommandOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Err(source)) => Err(CommandError::Io {
                program: program_name,
                source,
            }),
            Err(_) => Err(CommandError::TimedOut {
                program: program_name,
                timeout,
            }),
        }
    }
}

//! Subprocess execution.
//!
//! Every external tool the pipeline touches (git, brew, npm, uv, npx, which)
//! goes through [`CommandRunner`], so the orchestration can be driven by a
//! recording runner in tests.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;

/// A command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// First argument, typically the sub-command (`clone`, `install`, ...).
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Self::default()
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Human-readable reason for a non-zero exit.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        let status = match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        if stderr.is_empty() {
            status
        } else {
            format!("{status}: {stderr}")
        }
    }
}

/// Executes subprocesses to completion.
///
/// No timeout is applied; a hung tool suspends the caller until it exits.
#[async_trait]
pub trait CommandRunner: Send + Sync + fmt::Debug {
    async fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// Runner backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
        let mut process = tokio::process::Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.current_dir {
            process.current_dir(dir);
        }

        tracing::debug!(command = %command, "Running subprocess");
        let output = process.output().await?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a command and fold spawn errors and non-zero exits into one message.
pub async fn run_to_completion(
    runner: &dyn CommandRunner,
    command: &CommandSpec,
) -> Result<CommandOutput, String> {
    match runner.run(command).await {
        Ok(output) if output.is_success() => Ok(output),
        Ok(output) => Err(format!("`{}` failed ({})", command, output.failure_message())),
        Err(err) => Err(format!("Failed to run `{}`: {}", command, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec::new("git")
            .args(["clone", "https://example.com/r.git"])
            .arg("/tmp/r");
        assert_eq!(spec.to_string(), "git clone https://example.com/r.git /tmp/r");
        assert_eq!(spec.subcommand(), Some("clone"));
    }

    #[test]
    fn failure_message_prefers_stderr() {
        let output = CommandOutput::failure(128, "fatal: destination path exists\n");
        assert_eq!(
            output.failure_message(),
            "exit status 128: fatal: destination path exists"
        );
        assert_eq!(CommandOutput::failure(1, "").failure_message(), "exit status 1");
        assert!(!output.is_success());
        assert!(CommandOutput::success().is_success());
    }

    #[tokio::test]
    async fn system_runner_reports_missing_program_as_error() {
        let spec = CommandSpec::new("joypack-definitely-not-a-real-binary");
        let result = run_to_completion(&SystemRunner, &spec).await;
        let message = result.unwrap_err();
        assert!(message.starts_with("Failed to run"));
    }
}

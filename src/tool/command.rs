//! Builder for host tool invocations.
//!
//! Every fetch handler runs an external version control tool. [`ToolCommand`]
//! gives them one fluent way to assemble the invocation (arguments, working
//! directory, environment additions and removals) and one way to run it, so
//! logging and failure reporting are consistent across tools.
//!
//! No timeout is applied: a fetch is allowed to take as long as the tool
//! needs.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fetchdep::tool::command::ToolCommand;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let output = ToolCommand::new("git", "/usr/bin/git")
//!     .args(["clone", "https://example.com/repo.git", "--progress", "/work/repo"])
//!     .env_remove("GIT_DIR")
//!     .with_context("repo")
//!     .execute()
//!     .await?;
//! println!("{}", output.stderr);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::core::FetchdepError;

/// Fluent builder for a single host tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    /// Tool name used in logs and errors (e.g. "git")
    tool: String,

    /// Resolved executable
    program: PathBuf,

    /// Arguments, in order
    args: Vec<String>,

    /// Working directory (defaults to the process's current directory)
    current_dir: Option<PathBuf>,

    /// Whether to capture output (true) or inherit stdio (false)
    capture_output: bool,

    /// Environment variables to set
    env_vars: Vec<(String, String)>,

    /// Environment variables to remove
    env_removed: Vec<String>,

    /// Optional context (typically the dependency name) for log lines
    context: Option<String>,
}

/// Captured output of a finished command.
///
/// Both streams are empty when stdio was inherited.
#[derive(Debug, Clone, Default)]
pub struct ToolCommandOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl ToolCommandOutput {
    /// Both streams joined, stdout first, skipping empty ones.
    #[must_use]
    pub fn combined(&self) -> String {
        [self.stdout.trim_end(), self.stderr.trim_end()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ToolCommand {
    /// Create a command for `tool`, executed through `program`.
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            capture_output: true,
            env_vars: Vec::new(),
            env_removed: Vec::new(),
            context: None,
        }
    }

    /// Run the command from `dir`.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Remove an inherited environment variable from the child process.
    ///
    /// Removals are applied after [`env`](Self::env) additions.
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_removed.push(key.into());
        self
    }

    /// Let the child write directly to the terminal.
    pub const fn inherit_stdio(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Capture (true) or inherit (false) the child's output.
    pub const fn capture(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Set a context (e.g. dependency name) for log messages.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Arguments added so far.
    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Execute the command.
    ///
    /// # Errors
    ///
    /// Fails if the process cannot be spawned, or with
    /// [`FetchdepError::ToolCommandFailed`] (carrying the captured output) if
    /// it exits unsuccessfully.
    pub async fn execute(self) -> Result<ToolCommandOutput> {
        let prefix = self.context.as_deref().map(|c| format!("({c}) ")).unwrap_or_default();
        let rendered = format!("{} {}", self.program.display(), self.args.join(" "));
        tracing::debug!(target: "tool", "{prefix}Executing command: {rendered}");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref dir) = self.current_dir {
            tracing::trace!(target: "tool", "{prefix}Working directory: {}", dir.display());
            cmd.current_dir(dir);
        }

        for (key, value) in &self.env_vars {
            tracing::trace!(target: "tool", "{prefix}Setting env var: {key}={value}");
            cmd.env(key, value);
        }
        for key in &self.env_removed {
            cmd.env_remove(key);
        }

        // an aborted fetch must not leave the tool running
        cmd.kill_on_drop(true);
        cmd.stdin(Stdio::null());
        if self.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        let output = cmd.output().await.with_context(|| format!("Failed to execute {rendered}"))?;

        let result = ToolCommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            tracing::debug!(
                target: "tool",
                "{prefix}Command failed with exit code: {:?}",
                output.status.code()
            );

            return Err(FetchdepError::ToolCommandFailed {
                tool: self.tool,
                operation: self.args.first().cloned().unwrap_or_else(|| "unknown".to_string()),
                output: result.combined(),
            }
            .into());
        }

        tracing::debug!(target: "tool", "{prefix}Command completed successfully");
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh", "sh").args(["-c", script])
    }

    #[tokio::test]
    async fn test_execute_captures_output() {
        let output = sh("echo out; echo err >&2").execute().await.unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.combined(), "out\nerr");
    }

    #[tokio::test]
    async fn test_execute_failure_is_typed() {
        let err = sh("echo broken >&2; exit 3").execute().await.unwrap_err();
        match err.downcast_ref::<FetchdepError>() {
            Some(FetchdepError::ToolCommandFailed { tool, operation, output }) => {
                assert_eq!(tool, "sh");
                assert_eq!(operation, "-c");
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_environment_and_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let output = sh("echo \"$FETCHDEP_A:${FETCHDEP_B:-unset}\"; pwd")
            .env("FETCHDEP_A", "set")
            .env("FETCHDEP_B", "set")
            .env_remove("FETCHDEP_B")
            .current_dir(temp.path())
            .execute()
            .await
            .unwrap();

        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("set:unset"));
        let pwd = PathBuf::from(lines.next().unwrap());
        assert_eq!(pwd.canonicalize().unwrap(), temp.path().canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let result = ToolCommand::new("nope", "/nonexistent/fetchdep-tool").execute().await;
        assert!(result.is_err());
    }
}

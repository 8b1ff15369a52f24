//! Process execution without a shell.
//!
//! Every site operation that needs privileges (wp-cli, mysql, chown, the
//! proxy reload) goes through a [`CommandRunner`]. Arguments travel as a
//! list, so a subdomain or site title is always exactly one argv element.

use async_trait::async_trait;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::errors::ExecError;

/// Flags whose values never appear in logs, errors or provisioning records.
const SECRET_FLAGS: &[&str] = &["--dbpass", "--admin_password"];
const MASK: &str = "********";

/// A program invocation: program, argument list, optional working directory
/// and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
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

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Build from a non-empty argv vector such as the configured reload command.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Self::new(program.clone()).args(rest.iter().cloned()))
    }

    /// Human-readable form for logs and error messages. Environment values
    /// are never included and secret flag values are masked.
    pub fn display(&self) -> String {
        std::iter::once(Cow::Borrowed(self.program.as_str()))
            .chain(self.args.iter().map(|a| redact(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True if any argument equals `needle` or starts with `needle` followed by `=`.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args
            .iter()
            .any(|a| a == needle || a.strip_prefix(needle).is_some_and(|r| r.starts_with('=')))
    }
}

fn redact(arg: &str) -> Cow<'_, str> {
    for flag in SECRET_FLAGS {
        if arg.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')) {
            return Cow::Owned(format!("{}={}", flag, MASK));
        }
    }
    Cow::Borrowed(arg)
}

/// Abstraction over process execution for testability.
/// Real implementation: `ProcessRunner`. Test double: `testing::RecordingRunner`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and return captured stdout.
    async fn run(&self, spec: &CommandSpec) -> Result<String, ExecError>;
}

/// Spawns real child processes with `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<String, ExecError> {
        tracing::debug!(command = %spec.display(), cwd = ?spec.cwd, "spawning");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let output = command.output().await.map_err(|source| ExecError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(command = %spec.display(), status = ?output.status.code(), %stderr, "command failed");
            return Err(ExecError::Failed {
                command: spec.display(),
                status: output.status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

//! Subprocess execution.
//!
//! Promus talks to git and ssh-keygen through the narrow [`CommandRunner`]
//! interface: run a program, get stdout, stderr and the exit code. Calls are
//! synchronous and never retried; a nonzero exit is surfaced to the caller
//! through [`CommandOutput::check`].

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use thiserror::Error as ThisError;
use tracing::debug;

use crate::Error;

/// Errors from running an external program.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum ExecError {
    /// The program could not be started.
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        /// Rendered command line
        command: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("`{command}` exited with status {status}: {stderr}")]
    NonZeroExit {
        /// Rendered command line
        command: String,
        /// Exit code, or -1 when killed by a signal
        status: i32,
        /// Captured standard error
        stderr: String,
    },

    /// The program succeeded but printed something we cannot parse.
    #[error("Unexpected output from `{command}`: {output:?}")]
    UnexpectedOutput {
        /// Rendered command line
        command: String,
        /// The offending part of standard output
        output: String,
    },
}

impl ExecError {
    /// Check if the program never started.
    pub fn is_spawn_error(&self) -> bool {
        matches!(self, ExecError::Spawn { .. })
    }

    /// Exit status of a failed program, if it ran.
    pub fn status(&self) -> Option<i32> {
        match self {
            ExecError::NonZeroExit { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ExecError> for Error {
    fn from(err: ExecError) -> Self {
        Error::Exec(err)
    }
}

/// Captured result of a finished program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl CommandOutput {
    /// Whether the program exited with status 0.
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Turn a nonzero exit into an [`ExecError::NonZeroExit`].
    pub fn check(self, command: &str) -> Result<Self, ExecError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ExecError::NonZeroExit {
                command: command.to_string(),
                status: self.status,
                stderr: self.stderr.trim_end().to_string(),
            })
        }
    }
}

/// Render a program and its arguments for messages.
pub fn render_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Something that can run an external program.
pub trait CommandRunner {
    /// Run `program` with `args` and capture its output.
    ///
    /// Only a failure to start the program is an error; the exit code is
    /// reported in the returned [`CommandOutput`].
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ExecError>;

    /// Run a program and fail on a nonzero exit.
    fn run_checked(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ExecError> {
        self.run(program, args)?
            .check(&render_command(program, args))
    }
}

/// Runs programs directly through [`std::process::Command`], without a shell
/// in between, so arguments are never re-interpreted.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    cwd: Option<PathBuf>,
}

impl SystemRunner {
    /// Runner using the current working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner executing every program inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            cwd: Some(dir.as_ref().to_path_buf()),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ExecError> {
        let rendered = render_command(program, args);
        debug!("Running `{rendered}`");

        let mut command = Command::new(program);
        command.args(args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        let output = command.output().map_err(|source| ExecError::Spawn {
            command: rendered,
            source,
        })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code().unwrap_or(-1),
        })
    }
}

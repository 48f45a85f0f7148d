//! External git process runner.
//!
//! Commands are single pre-escaped strings (see [`crate::quote`]); the runner
//! splits them and launches the `git` binary directly, never a shell. Both
//! output streams are captured concurrently, so large outputs cannot deadlock
//! on a full pipe buffer.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::error::GitError;
use crate::quote::split;

/// Runs git commands with a fixed working directory.
#[derive(Debug, Clone)]
pub struct GitRunner {
    work_dir: PathBuf,
}

impl GitRunner {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Run a git command; non-zero exit is an error carrying stderr.
    pub fn run(&self, command: &str) -> Result<String, GitError> {
        let output = self.execute(command, None)?;
        self.interpret(command, output)
    }

    /// Run a git command, swallowing failure. `None` on non-zero exit.
    pub fn try_run(&self, command: &str) -> Option<String> {
        match self.run(command) {
            Ok(stdout) => Some(stdout),
            Err(err) => {
                tracing::debug!("tolerated git failure: {err}");
                None
            }
        }
    }

    /// Run a git command feeding `input` on stdin.
    pub fn run_with_input(&self, command: &str, input: &str) -> Result<String, GitError> {
        let output = self.execute(command, Some(input))?;
        self.interpret(command, output)
    }

    fn execute(&self, command: &str, input: Option<&str>) -> Result<Output, GitError> {
        let args = split(command);
        tracing::trace!(dir = %self.work_dir.display(), "git {command}");

        let mut child = Command::new("git")
            .args(&args)
            .current_dir(&self.work_dir)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GitError::Launch {
                command: command.to_string(),
                source,
            })?;

        if let Some(text) = input {
            // Bounded input (commit messages); written before the child can
            // fill its output pipes.
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(text.as_bytes())
                    .map_err(|source| GitError::Launch {
                        command: command.to_string(),
                        source,
                    })?;
            }
        }

        // wait_with_output drains stdout and stderr concurrently.
        child
            .wait_with_output()
            .map_err(|source| GitError::Launch {
                command: command.to_string(),
                source,
            })
    }

    fn interpret(&self, command: &str, output: Output) -> Result<String, GitError> {
        let stdout = text_of(&output.stdout);
        if output.status.success() {
            return Ok(stdout);
        }
        let stderr = text_of(&output.stderr);
        match output.status.code() {
            Some(code) => Err(GitError::CommandFailed {
                command: command.to_string(),
                code,
                stdout,
                stderr,
            }),
            None => Err(GitError::Terminated {
                command: command.to_string(),
            }),
        }
    }
}

fn text_of(bytes: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    while text.ends_with('\n') || text.ends_with('\r') {
        text.pop();
    }
    text
}

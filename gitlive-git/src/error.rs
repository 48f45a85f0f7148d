//! Error types for gitlive-git.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from running git or managing the workspace.
#[derive(Debug, Error)]
pub enum GitError {
    /// git exited non-zero. Carries the exact command line, exit code and
    /// both output streams.
    #[error("`git {command}` exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// git was killed by a signal before producing an exit code.
    #[error("`git {command}` terminated without an exit code")]
    Terminated { command: String },

    /// The git binary could not be launched at all.
    #[error("failed to launch git: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error around the workspace directory, with annotated path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`GitError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> GitError {
    GitError::Io {
        path: path.into(),
        source,
    }
}

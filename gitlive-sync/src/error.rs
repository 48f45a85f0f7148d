//! Error taxonomy for the publishing engine.
//!
//! Exit codes are part of the CLI contract:
//! 1 repository detection, 2 LIVE URL unresolved, 3 LIVE unreachable or
//! LIVE/main missing, 4 publishing step failed mid-loop, 5 divergence,
//! 10 git subprocess error, 11 anything else.

use std::path::PathBuf;

use thiserror::Error;

use gitlive_git::GitError;

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The invocation directory is not a git repository.
    #[error("not a git repository: {path}")]
    Detection { path: PathBuf },

    /// No LIVE URL from CLI, environment or config file.
    #[error("no LIVE url configured; pass --url, set GITLIVE_URL, or add `url` to gitlive.z0")]
    MissingUrl,

    /// The LIVE remote did not resolve, or LIVE/main is required but absent.
    #[error("LIVE remote unavailable: {detail}")]
    LiveUnreachable { detail: String },

    /// A step of the publishing loop failed for a specific tag.
    #[error("publishing {tag} failed: {source}")]
    Publish {
        tag: String,
        #[source]
        source: GitError,
    },

    /// Incremental mode found a gap in the published prefix.
    #[error(
        "source history diverged from LIVE: {tag} is missing from the published prefix; \
         re-run with --repair or --nuke"
    )]
    Divergence { tag: String },

    /// A git subprocess failure outside the publishing loop.
    #[error(transparent)]
    Git(#[from] GitError),

    /// A malformed file-selection rule.
    #[error("invalid file selection rule '{rule}': {message}")]
    Rule { rule: String, message: String },
}

impl SyncError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Detection { .. } => 1,
            SyncError::MissingUrl => 2,
            SyncError::LiveUnreachable { .. } => 3,
            SyncError::Publish { .. } => 4,
            SyncError::Divergence { .. } => 5,
            SyncError::Git(_) => 10,
            SyncError::Rule { .. } => 11,
        }
    }
}

//! Throwaway workspace repository.
//!
//! A uniquely named temp directory holding a fresh repository with two
//! remotes: `REPO` (the source) and `LIVE` (the publish target). The
//! committer identity is pinned to a synthetic value so commit SHAs are a
//! pure function of tree + parents + message + identity.
//!
//! The directory is removed on drop on every exit path. Removal retries with
//! backoff, clearing read-only attributes between attempts; some platforms
//! mark `.git/objects/pack/*` read-only.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::error::{io_err, GitError};
use crate::quote::quote;
use crate::runner::GitRunner;

/// Remote name for the private source repository.
pub const SOURCE_REMOTE: &str = "REPO";
/// Remote name for the public target repository.
pub const LIVE_REMOTE: &str = "LIVE";

/// Synthetic committer identity used for every published commit.
pub const PUBLISHER_NAME: &str = "GitLive Publisher";
pub const PUBLISHER_EMAIL: &str = "gitlive@transient.local";

const REMOVE_ATTEMPTS: u32 = 5;
const REMOVE_BACKOFF: Duration = Duration::from_millis(200);

/// A temporary repository wired to the source and LIVE remotes.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    runner: GitRunner,
}

impl Workspace {
    /// Create the workspace: unique temp dir, `git init`, pinned identity,
    /// both remotes configured. No fetching happens here.
    pub fn create(source_repo: &Path, live_url: &str) -> Result<Self, GitError> {
        let dir = tempfile::Builder::new()
            .prefix("gitlive-publisher-")
            .tempdir()
            .map_err(|e| io_err("gitlive-publisher temp dir", e))?
            .into_path();
        tracing::debug!("workspace at {}", dir.display());

        let runner = GitRunner::new(&dir);
        runner.run("init")?;
        runner.run(&format!("config user.email {PUBLISHER_EMAIL}"))?;
        runner.run(&format!("config user.name {}", quote(PUBLISHER_NAME)))?;
        runner.run(&format!(
            "remote add {SOURCE_REMOTE} {}",
            quote(&source_repo.to_string_lossy())
        ))?;
        runner.run(&format!("remote add {LIVE_REMOTE} {}", quote(live_url)))?;

        Ok(Self { dir, runner })
    }

    pub fn runner(&self) -> &GitRunner {
        &self.runner
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        remove_dir_all_retrying(&self.dir);
    }
}

fn remove_dir_all_retrying(dir: &Path) {
    for attempt in 1..=REMOVE_ATTEMPTS {
        match fs::remove_dir_all(dir) {
            Ok(()) => return,
            Err(err) if err.kind() == ErrorKind::NotFound => return,
            Err(err) => {
                tracing::debug!("workspace removal attempt {attempt} failed: {err}");
                clear_readonly(dir);
                if attempt < REMOVE_ATTEMPTS {
                    thread::sleep(REMOVE_BACKOFF);
                }
            }
        }
    }
    tracing::warn!("could not remove workspace at {}", dir.display());
}

fn clear_readonly(path: &Path) {
    let Ok(meta) = path.symlink_metadata() else {
        return;
    };
    let mut perms = meta.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        let _ = fs::set_permissions(path, perms);
    }
    if meta.is_dir() {
        let Ok(entries) = fs::read_dir(path) else {
            return;
        };
        for entry in entries.flatten() {
            clear_readonly(&entry.path());
        }
    }
}

//! GitLive git layer — subprocess runner, quoting, throwaway workspace.
//!
//! The `git` binary is the only collaborator; everything here treats it as an
//! opaque command runner bound to a working directory.

pub mod error;
pub mod quote;
pub mod runner;
pub mod workspace;

pub use error::GitError;
pub use quote::quote;
pub use runner::GitRunner;
pub use workspace::{Workspace, LIVE_REMOTE, SOURCE_REMOTE};

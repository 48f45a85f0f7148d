//! GitLive sync library — file selection, provenance, the publishing engine.
//!
//! Public API surface:
//! - [`engine`] — [`sync`] with [`SyncOptions`] / [`SyncMode`] / [`SyncReport`]
//! - [`selector`] — ordered `+`/`-` glob rules and plumbing tree filtering
//! - [`provenance`] — the commit-message trailer and [`PublishedSet`] recovery
//! - [`tags`] — `live/*` tag records and ordering
//! - [`error`] — [`SyncError`] with CLI exit codes

pub mod engine;
pub mod error;
pub mod provenance;
pub mod selector;
pub mod tags;

pub use engine::{sync, SyncMode, SyncOptions, SyncReport};
pub use error::SyncError;
pub use provenance::PublishedSet;
pub use selector::{parse_rules, Rule};

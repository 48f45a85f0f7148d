//! GitLive core library — Z0 format, layered configuration, URL utilities.
//!
//! Public API surface:
//! - [`z0`] — the line-oriented configuration format and tolerant reader
//! - [`config`] — CLI / environment / file merging with security levels
//! - [`urlx`] — git URL normalization and credential injection

pub mod config;
pub mod urlx;
pub mod z0;

pub use config::{ConfigReader, SecurityLevel};
pub use z0::{Z0Document, Z0Error, Z0Node, Z0Reader};

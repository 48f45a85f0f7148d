//! Z0 — the line-oriented configuration format.
//!
//! Used twice: for the on-disk `gitlive.z0` config file, and for parsing the
//! provenance block embedded in every published commit message. See
//! [`parser`] for the grammar and [`reader`] for tolerant access.

mod node;
mod parser;
mod reader;

pub use node::{keys_equal, normalize_key, ArrayKind, Z0Node};
pub use reader::Z0Reader;

use thiserror::Error;

/// Errors from parsing or reading Z0 documents.
#[derive(Debug, Error)]
pub enum Z0Error {
    /// Syntax or navigation failure, with the 1-based source line.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// `required()` on a node that does not exist.
    #[error("missing required value '{path}'")]
    Missing { path: String },

    /// `required()` on an object or array.
    #[error("'{path}' does not hold a single value")]
    NotScalar { path: String },
}

/// A parsed Z0 document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Z0Document {
    root: Z0Node,
}

impl Z0Document {
    /// Parse a complete document. All errors are line-numbered.
    pub fn parse(text: &str) -> Result<Self, Z0Error> {
        Ok(Self {
            root: parser::parse(text)?,
        })
    }

    /// Reader positioned at the document root.
    pub fn root(&self) -> Z0Reader<'_> {
        Z0Reader::of(&self.root)
    }

    /// Shorthand for `root().get(key)`.
    pub fn get(&self, key: &str) -> Z0Reader<'_> {
        self.root().get(key)
    }
}

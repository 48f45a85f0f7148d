//! Tolerant read access over a parsed Z0 tree.
//!
//! A `Z0Reader` is a cursor that may point at nothing: looking up a missing
//! child yields another (absent) cursor instead of an error, so chained
//! lookups like `doc.get("remote").get("url").optional("")` never panic.

use super::node::Z0Node;
use super::Z0Error;

/// Borrowing cursor over an optional node, carrying the path walked so far
/// for error messages.
#[derive(Debug, Clone)]
pub struct Z0Reader<'a> {
    node: Option<&'a Z0Node>,
    path: String,
}

impl<'a> Z0Reader<'a> {
    pub(crate) fn of(node: &'a Z0Node) -> Self {
        Self {
            node: Some(node),
            path: String::new(),
        }
    }

    fn extend(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    /// Child lookup; a missing child (or a scalar receiver) yields an absent
    /// cursor, which is falsy.
    pub fn get(&self, key: &str) -> Z0Reader<'a> {
        Z0Reader {
            node: self.node.and_then(|n| n.child(key)),
            path: self.extend(key),
        }
    }

    /// Array element lookup by index.
    pub fn at(&self, index: usize) -> Z0Reader<'a> {
        self.get(&index.to_string())
    }

    /// Truthiness: does this cursor point at a node at all?
    pub fn exists(&self) -> bool {
        self.node.is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.node.and_then(|n| n.child(key)).is_some()
    }

    /// Scalar content, `None` when absent or not a scalar.
    pub fn value(&self) -> Option<&'a str> {
        self.node.and_then(Z0Node::value)
    }

    /// Scalar content, or `default` when the node is missing or non-scalar.
    pub fn optional(&self, default: &str) -> String {
        self.value().unwrap_or(default).to_string()
    }

    /// Scalar content, or an error naming the missing path.
    pub fn required(&self) -> Result<&'a str, Z0Error> {
        match self.node {
            None => Err(Z0Error::Missing {
                path: self.path.clone(),
            }),
            Some(node) => node.value().ok_or_else(|| Z0Error::NotScalar {
                path: self.path.clone(),
            }),
        }
    }

    /// Number of direct children; 0 when absent or scalar.
    pub fn len(&self) -> usize {
        self.node.map_or(0, Z0Node::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate array elements as readers, in order.
    pub fn items(&self) -> Vec<Z0Reader<'a>> {
        let Some(node) = self.node else {
            return Vec::new();
        };
        node.items()
            .enumerate()
            .map(|(i, child)| Z0Reader {
                node: Some(child),
                path: self.extend(&i.to_string()),
            })
            .collect()
    }
}

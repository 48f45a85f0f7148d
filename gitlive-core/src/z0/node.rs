//! Z0 document tree.
//!
//! A node has exactly one of three shapes: scalar value, object, or array.
//! Object child names are unique under normalized comparison (ASCII lowercase,
//! `-` ≡ `_`) and keep insertion order. Array children are addressed by
//! decimal index and carry an element-kind discriminant fixed by first use.

/// Normalize a key for lookup and comparison: ASCII-lowercase, `-` → `_`.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Returns true when two keys are equal under Z0 key normalization.
pub fn keys_equal(a: &str, b: &str) -> bool {
    normalize_key(a) == normalize_key(b)
}

/// Element kind of an array node, refined from `Unknown` by the first child:
/// a scalar assignment makes it `Value`, a nested assignment `Dictionary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayKind {
    #[default]
    Unknown,
    Value,
    Dictionary,
}

/// One node of a parsed Z0 document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Z0Node {
    /// A scalar string value.
    Value(String),
    /// Ordered mapping of child name → node.
    Object(Vec<(String, Z0Node)>),
    /// Ordered list of elements indexed by `"0"`, `"1"`, …
    Array { kind: ArrayKind, items: Vec<Z0Node> },
}

impl Z0Node {
    pub fn empty_object() -> Self {
        Z0Node::Object(Vec::new())
    }

    pub fn empty_array() -> Self {
        Z0Node::Array {
            kind: ArrayKind::Unknown,
            items: Vec::new(),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Z0Node::Value(_))
    }

    /// Scalar content, or `None` for objects and arrays.
    pub fn value(&self) -> Option<&str> {
        match self {
            Z0Node::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Number of direct children (0 for scalars).
    pub fn len(&self) -> usize {
        match self {
            Z0Node::Value(_) => 0,
            Z0Node::Object(children) => children.len(),
            Z0Node::Array { items, .. } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a direct child. Objects match by normalized name; arrays by
    /// decimal index.
    pub fn child(&self, key: &str) -> Option<&Z0Node> {
        match self {
            Z0Node::Value(_) => None,
            Z0Node::Object(children) => children
                .iter()
                .find(|(name, _)| keys_equal(name, key))
                .map(|(_, node)| node),
            Z0Node::Array { items, .. } => {
                key.parse::<usize>().ok().and_then(|i| items.get(i))
            }
        }
    }

    pub(crate) fn child_mut(&mut self, key: &str) -> Option<&mut Z0Node> {
        match self {
            Z0Node::Value(_) => None,
            Z0Node::Object(children) => children
                .iter_mut()
                .find(|(name, _)| keys_equal(name, key))
                .map(|(_, node)| node),
            Z0Node::Array { items, .. } => {
                key.parse::<usize>().ok().and_then(|i| items.get_mut(i))
            }
        }
    }

    /// Iterate array elements in order. Empty for scalars and objects.
    pub fn items(&self) -> std::slice::Iter<'_, Z0Node> {
        const NONE: &[Z0Node] = &[];
        match self {
            Z0Node::Array { items, .. } => items.iter(),
            _ => NONE.iter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_normalization_folds_case_and_separators() {
        assert_eq!(normalize_key("Commit-Count"), "commit_count");
        assert!(keys_equal("commit-count", "COMMIT_COUNT"));
        assert!(!keys_equal("commit", "commit-count"));
    }

    #[test]
    fn object_child_lookup_is_normalized() {
        let node = Z0Node::Object(vec![(
            "Public-Url".to_string(),
            Z0Node::Value("x".to_string()),
        )]);
        assert_eq!(node.child("public_url").and_then(Z0Node::value), Some("x"));
        assert!(node.child("missing").is_none());
    }

    #[test]
    fn array_child_lookup_is_by_index() {
        let node = Z0Node::Array {
            kind: ArrayKind::Value,
            items: vec![
                Z0Node::Value("a".to_string()),
                Z0Node::Value("b".to_string()),
            ],
        };
        assert_eq!(node.child("1").and_then(Z0Node::value), Some("b"));
        assert!(node.child("2").is_none());
        assert!(node.child("x").is_none());
        assert_eq!(node.len(), 2);
    }

    #[test]
    fn scalar_has_no_children() {
        let node = Z0Node::Value("v".to_string());
        assert!(node.child("0").is_none());
        assert_eq!(node.len(), 0);
        assert_eq!(node.items().count(), 0);
    }
}

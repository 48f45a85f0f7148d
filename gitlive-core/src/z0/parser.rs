//! Line-oriented, forward-only Z0 parser.
//!
//! Grammar per line: blank lines and `//` comments are skipped; a line
//! containing `=` is an assignment (split on the first `=`, both sides
//! trimmed); a line ending in `:` opens a section whose path prefixes all
//! subsequent assignments.
//!
//! Navigation is forward-only: moving away from a subtree locks it, and any
//! later assignment that lands inside a locked subtree is a line-numbered
//! error. The lock set holds normalized node paths; the walk-up phase of each
//! assignment adds every node it leaves behind.

use std::collections::HashSet;

use super::node::{keys_equal, normalize_key, ArrayKind, Z0Node};
use super::Z0Error;

pub(crate) fn parse(text: &str) -> Result<Z0Node, Z0Error> {
    let mut parser = Parser::new();
    for (idx, raw) in text.lines().enumerate() {
        parser.line(idx + 1, raw)?;
    }
    Ok(parser.root)
}

struct Parser {
    root: Z0Node,
    /// Open section path, with `#` segments already resolved to indices.
    section: Vec<String>,
    /// Concrete path of the most recently assigned leaf.
    current: Vec<String>,
    /// Normalized paths of subtrees that have been navigated away from.
    locked: HashSet<String>,
}

impl Parser {
    fn new() -> Self {
        Self {
            root: Z0Node::empty_object(),
            section: Vec::new(),
            current: Vec::new(),
            locked: HashSet::new(),
        }
    }

    fn line(&mut self, line: usize, raw: &str) -> Result<(), Z0Error> {
        let text = raw.trim();
        if text.is_empty() || text.starts_with("//") {
            return Ok(());
        }
        if let Some((lhs, rhs)) = text.split_once('=') {
            return self.assign(line, lhs.trim(), rhs.trim());
        }
        if let Some(head) = text.strip_suffix(':') {
            return self.open_section(line, head.trim());
        }
        Err(parse_err(line, "expected `key = value` or `section:`"))
    }

    // -----------------------------------------------------------------------
    // Sections
    // -----------------------------------------------------------------------

    fn open_section(&mut self, line: usize, text: &str) -> Result<(), Z0Error> {
        let segments = split_path(line, text)?;
        let mut resolved = Vec::with_capacity(segments.len());
        for seg in segments {
            if seg == "#" {
                // Every `#` in a header addresses a fresh element: the next
                // index past whatever the parent holds right now.
                let next = self.lookup(&resolved).map_or(0, Z0Node::len);
                resolved.push(next.to_string());
            } else {
                resolved.push(seg);
            }
        }
        self.section = resolved;
        Ok(())
    }

    fn lookup(&self, path: &[String]) -> Option<&Z0Node> {
        let mut node = &self.root;
        for seg in path {
            node = node.child(seg)?;
        }
        Some(node)
    }

    // -----------------------------------------------------------------------
    // Assignments
    // -----------------------------------------------------------------------

    fn assign(&mut self, line: usize, lhs: &str, rhs: &str) -> Result<(), Z0Error> {
        let lhs_segments = split_path(line, lhs)?;

        // An assignment whose first segment repeats the open section almost
        // certainly means a missing section reset: `a = v` under `a:` would
        // silently produce `a.a`.
        if let (Some(section_head), Some(lhs_head)) =
            (self.section.first(), lhs_segments.first())
        {
            if keys_equal(section_head, lhs_head) {
                return Err(parse_err(
                    line,
                    format!(
                        "'{lhs_head}' repeats the first segment of the open section '{}'",
                        self.section.join(".")
                    ),
                ));
            }
        }

        let mut path = self.section.clone();
        path.extend(lhs_segments);

        // Longest common prefix with the previous assignment's concrete path.
        // A `#` segment is matched by any numeric segment.
        let mut lcp = 0;
        while lcp < path.len() && lcp < self.current.len() {
            let new_seg = path[lcp].as_str();
            let cur_seg = self.current[lcp].as_str();
            let matched = keys_equal(new_seg, cur_seg) || (new_seg == "#" && is_index(cur_seg));
            if !matched {
                break;
            }
            lcp += 1;
        }
        // A terminal `#` wholly inside the prefix still opens a new element.
        if lcp == path.len() && path.last().map(String::as_str) == Some("#") {
            lcp -= 1;
        }

        // Walk up, locking every node left behind.
        for depth in (lcp + 1..=self.current.len()).rev() {
            self.locked.insert(normalized_path(&self.current[..depth]));
        }

        self.descend_and_assign(line, &path, lcp, rhs)
    }

    fn descend_and_assign(
        &mut self,
        line: usize,
        path: &[String],
        lcp: usize,
        rhs: &str,
    ) -> Result<(), Z0Error> {
        let mut realized: Vec<String> = Vec::with_capacity(path.len());
        let mut node = &mut self.root;

        for depth in 0..path.len() {
            let seg = path[depth].as_str();
            let last = depth + 1 == path.len();
            let next = path.get(depth + 1).map(String::as_str);

            let key = if seg == "#" && depth < lcp {
                // `#` matched inside the common prefix continues the element
                // the previous assignment was filling.
                self.current[depth].clone()
            } else if seg == "#" {
                append_element(node, last, line)?
            } else {
                resolve_named(node, seg, next, last, line)?
            };

            realized.push(key.clone());
            if self.locked.contains(&normalized_path(&realized)) {
                return Err(parse_err(
                    line,
                    format!("'{}' was already closed by a later assignment", realized.join(".")),
                ));
            }

            node = node
                .child_mut(&key)
                .ok_or_else(|| parse_err(line, format!("cannot navigate into '{seg}'")))?;
        }

        match node {
            Z0Node::Value(v) => *v = rhs.to_string(),
            Z0Node::Object(_) => {
                return Err(parse_err(
                    line,
                    format!("cannot assign a value to object '{}'", realized.join(".")),
                ))
            }
            Z0Node::Array { .. } => {
                return Err(parse_err(
                    line,
                    format!("cannot assign a value to array '{}'", realized.join(".")),
                ))
            }
        }

        self.current = realized;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Node construction steps
// ---------------------------------------------------------------------------

/// Turn `node` into an array if it is still an empty object, then append a
/// fresh element for a `#` segment. Returns the element's decimal key.
fn append_element(node: &mut Z0Node, last: bool, line: usize) -> Result<String, Z0Error> {
    match node {
        Z0Node::Object(children) if children.is_empty() => *node = Z0Node::empty_array(),
        Z0Node::Array { .. } => {}
        Z0Node::Object(_) => {
            return Err(parse_err(line, "cannot append an array element to an object"))
        }
        Z0Node::Value(_) => {
            return Err(parse_err(line, "cannot append an array element to a value"))
        }
    }
    let Z0Node::Array { kind, items } = node else {
        unreachable!("node was just made an array");
    };
    refine_kind(kind, last, line)?;
    items.push(if last {
        Z0Node::Value(String::new())
    } else {
        Z0Node::empty_object()
    });
    Ok((items.len() - 1).to_string())
}

/// Resolve a named or numeric segment under `node`, creating the child when
/// it does not exist yet. Returns the concrete child key.
fn resolve_named(
    node: &mut Z0Node,
    seg: &str,
    next: Option<&str>,
    last: bool,
    line: usize,
) -> Result<String, Z0Error> {
    match node {
        Z0Node::Value(_) => Err(parse_err(
            line,
            format!("cannot add '{seg}' under a plain value"),
        )),
        Z0Node::Array { kind, items } => {
            if !is_index(seg) {
                return Err(parse_err(
                    line,
                    format!("array already sealed; named key '{seg}' is not allowed"),
                ));
            }
            let index: usize = seg
                .parse()
                .map_err(|_| parse_err(line, format!("array index '{seg}' is out of range")))?;
            if index < items.len() {
                return Ok(seg.to_string());
            }
            if index == items.len() {
                refine_kind(kind, last, line)?;
                items.push(if last {
                    Z0Node::Value(String::new())
                } else {
                    Z0Node::empty_object()
                });
                return Ok(seg.to_string());
            }
            Err(parse_err(
                line,
                format!("array index '{seg}' skips over index {}", items.len()),
            ))
        }
        Z0Node::Object(_) => {
            if node.child(seg).is_none() {
                let child = if last {
                    Z0Node::Value(String::new())
                } else if next == Some("#") || next.map(is_index) == Some(true) {
                    Z0Node::empty_array()
                } else {
                    Z0Node::empty_object()
                };
                let Z0Node::Object(children) = node else {
                    unreachable!("shape checked above");
                };
                children.push((seg.to_string(), child));
            }
            Ok(seg.to_string())
        }
    }
}

/// Refine an array's element kind on first use; mixing kinds is an error.
fn refine_kind(kind: &mut ArrayKind, scalar: bool, line: usize) -> Result<(), Z0Error> {
    let wanted = if scalar { ArrayKind::Value } else { ArrayKind::Dictionary };
    match *kind {
        ArrayKind::Unknown => {
            *kind = wanted;
            Ok(())
        }
        k if k == wanted => Ok(()),
        _ => Err(parse_err(
            line,
            "cannot mix value and dictionary elements in one array",
        )),
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn split_path(line: usize, text: &str) -> Result<Vec<String>, Z0Error> {
    if text.is_empty() {
        return Err(parse_err(line, "empty path"));
    }
    if text.starts_with('.') || text.ends_with('.') || text.contains("..") {
        return Err(parse_err(line, format!("invalid path '{text}'")));
    }
    let segments: Vec<String> = text.split('.').map(str::to_string).collect();
    for seg in &segments {
        if !valid_segment(seg) {
            return Err(parse_err(line, format!("invalid path segment '{seg}'")));
        }
    }
    Ok(segments)
}

fn valid_segment(seg: &str) -> bool {
    if seg == "#" {
        return true;
    }
    let mut chars = seg.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if first.is_ascii_digit() {
        return seg.chars().all(|c| c.is_ascii_digit());
    }
    (first.is_ascii_alphabetic() || first == '_' || first == '-')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_index(seg: &str) -> bool {
    !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit())
}

fn normalized_path(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| normalize_key(s))
        .collect::<Vec<_>>()
        .join(".")
}

fn parse_err(line: usize, message: impl Into<String>) -> Z0Error {
    Z0Error::Parse {
        line,
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

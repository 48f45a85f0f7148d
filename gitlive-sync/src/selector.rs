//! Ordered add/remove file selection over a git tree.
//!
//! Rules are `+ <glob>` / `- <glob>` strings with Ant-style globs, compiled
//! to anchored regular expressions. Matching is case-sensitive over paths
//! normalized to forward slashes. Tree filtering uses plumbing only
//! (`ls-tree`, `read-tree --empty`, `update-index --cacheinfo`, `write-tree`)
//! so no working tree is ever touched and file modes survive untouched.

use std::collections::BTreeMap;

use regex::Regex;

use gitlive_git::{quote, GitRunner};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Whether a rule adds to or removes from the selected set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Add,
    Remove,
}

/// One compiled selection rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: RuleKind,
    pub pattern: String,
    matcher: Regex,
}

impl Rule {
    /// Parse a `+ <glob>` or `- <glob>` specification.
    pub fn parse(spec: &str) -> Result<Self, SyncError> {
        let spec_trimmed = spec.trim();
        let (kind, glob) = match spec_trimmed.split_once(char::is_whitespace) {
            Some(("+", glob)) => (RuleKind::Add, glob.trim()),
            Some(("-", glob)) => (RuleKind::Remove, glob.trim()),
            _ => {
                return Err(SyncError::Rule {
                    rule: spec.to_string(),
                    message: "expected `+ <glob>` or `- <glob>`".to_string(),
                })
            }
        };
        if glob.is_empty() {
            return Err(SyncError::Rule {
                rule: spec.to_string(),
                message: "empty glob".to_string(),
            });
        }
        let regex = glob_to_regex(glob);
        let matcher = Regex::new(&regex).map_err(|e| SyncError::Rule {
            rule: spec.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            kind,
            pattern: glob.to_string(),
            matcher,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(&path.replace('\\', "/"))
    }
}

/// Parse an ordered rule list.
pub fn parse_rules(specs: &[String]) -> Result<Vec<Rule>, SyncError> {
    specs.iter().map(|s| Rule::parse(s)).collect()
}

/// Compile an Ant-style glob to an anchored regex.
///
/// `**` between separators matches zero or more whole segments, `*` any run
/// without `/`, `?` one character without `/`; a trailing `/` implies `/**`.
fn glob_to_regex(glob: &str) -> String {
    let mut pattern = glob.replace('\\', "/");
    if pattern.ends_with('/') {
        pattern.push_str("**");
    }
    let segments: Vec<&str> = pattern.split('/').collect();

    let mut regex = String::from("^");
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        if *segment == "**" {
            if last {
                regex.push_str(".*");
            } else {
                regex.push_str("(?:.*/)?");
            }
            continue;
        }
        for c in segment.chars() {
            match c {
                '*' => regex.push_str("[^/]*"),
                '?' => regex.push_str("[^/]"),
                c => regex.push_str(&regex::escape(&c.to_string())),
            }
        }
        if !last {
            regex.push('/');
        }
    }
    regex.push('$');
    regex
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// One `ls-tree -r` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: String,
    pub kind: String,
    pub sha: String,
    pub path: String,
}

/// Apply the ordered rule list to a set of entries.
///
/// The initial set is every entry when the first rule removes, empty when it
/// adds; each rule then adds or removes the matching subset. The result is
/// path-sorted and may be empty.
pub fn select<'a>(rules: &[Rule], entries: &'a [TreeEntry]) -> Vec<&'a TreeEntry> {
    let mut selected: BTreeMap<&str, &TreeEntry> = BTreeMap::new();
    if let Some(first) = rules.first() {
        if first.kind == RuleKind::Remove {
            for entry in entries {
                selected.insert(&entry.path, entry);
            }
        }
    }
    for rule in rules {
        match rule.kind {
            RuleKind::Add => {
                for entry in entries {
                    if rule.matches(&entry.path) {
                        selected.insert(&entry.path, entry);
                    }
                }
            }
            RuleKind::Remove => {
                selected.retain(|path, _| !rule.matches(path));
            }
        }
    }
    selected.into_values().collect()
}

// ---------------------------------------------------------------------------
// Tree reconstruction
// ---------------------------------------------------------------------------

/// Filter `tree` through the rules inside the workspace repository and return
/// the SHA of the reconstructed tree. An empty selection yields the empty
/// tree.
pub fn filter_tree(git: &GitRunner, tree: &str, rules: &[Rule]) -> Result<String, SyncError> {
    let listing = git.run(&format!("ls-tree -r {tree}"))?;
    let entries = parse_ls_tree(&listing);
    let selected = select(rules, &entries);
    tracing::debug!(
        "file selection kept {} of {} entries",
        selected.len(),
        entries.len()
    );

    git.run("read-tree --empty")?;
    for entry in &selected {
        git.run(&format!(
            "update-index --add --cacheinfo {}",
            quote(&format!("{},{},{}", entry.mode, entry.sha, entry.path))
        ))?;
    }
    Ok(git.run("write-tree")?)
}

fn parse_ls_tree(listing: &str) -> Vec<TreeEntry> {
    listing
        .lines()
        .filter_map(|line| {
            let (head, path) = line.split_once('\t')?;
            let mut fields = head.split_whitespace();
            Some(TreeEntry {
                mode: fields.next()?.to_string(),
                kind: fields.next()?.to_string(),
                sha: fields.next()?.to_string(),
                path: path.to_string(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

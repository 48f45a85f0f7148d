//! Round-trip provenance embedded in published commit messages.
//!
//! Every commit this tool creates on LIVE/main carries, after the subject and
//! a blank line, a Z0 block opened by the literal `// GitLive` marker. The
//! `commit` key (the full source SHA) is the only key recovery matches on;
//! `tag`, `date` and `commit-count` are informational.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};

use gitlive_core::z0::Z0Document;
use gitlive_git::{GitRunner, LIVE_REMOTE};

/// Marker line opening the provenance block.
pub const PROVENANCE_MARKER: &str = "// GitLive";

/// Provenance for one published release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Full 40-hex source commit SHA.
    pub commit: String,
    /// Original tag name including the `live/` prefix.
    pub tag: String,
    /// Publication time.
    pub date: DateTime<Utc>,
    /// Number of source commits in this release range.
    pub commit_count: usize,
}

/// Build the squashed-commit message: subject, blank line, provenance block.
pub fn format_message(display_tag: &str, short_sha: &str, provenance: &Provenance) -> String {
    format!(
        "GitLive: publish {display_tag} commit {short_sha}\n\
         \n\
         {PROVENANCE_MARKER}\n\
         commit = {}\n\
         tag = {}\n\
         date = {}\n\
         commit-count = {}\n",
        provenance.commit,
        provenance.tag,
        provenance.date.to_rfc3339_opts(SecondsFormat::Secs, true),
        provenance.commit_count,
    )
}

/// Extract the source commit SHA from a commit message, if it carries a
/// parseable provenance block with a non-empty `commit` key.
pub fn source_commit_of(message: &str) -> Option<String> {
    let lines: Vec<&str> = message.lines().collect();
    let start = lines.iter().position(|l| l.trim() == PROVENANCE_MARKER)?;
    let block = lines[start..].join("\n");
    let doc = Z0Document::parse(&block).ok()?;
    let commit = doc.get("commit").optional("");
    (!commit.is_empty()).then_some(commit)
}

// ---------------------------------------------------------------------------
// Published-set recovery
// ---------------------------------------------------------------------------

/// Mapping of source commit SHA → LIVE commit SHA, reconstructed from the
/// provenance blocks on LIVE/main. SHA keys are case-insensitive; on
/// duplicates the oldest (deepest) entry wins.
#[derive(Debug, Default)]
pub struct PublishedSet {
    entries: HashMap<String, String>,
    last_published: Option<DateTime<Utc>>,
}

impl PublishedSet {
    /// Scan `refs/remotes/LIVE/main` newest to oldest, parsing each commit's
    /// provenance. A missing branch or unparseable individual commits are
    /// tolerated; recovery never fails.
    pub fn recover(git: &GitRunner) -> Self {
        let mut set = PublishedSet::default();
        let Some(log) = git.try_run(&format!(
            "log --pretty=format:\"%H %ct\" refs/remotes/{LIVE_REMOTE}/main"
        )) else {
            tracing::debug!("no LIVE/main yet; starting from an empty published set");
            return set;
        };

        for line in log.lines() {
            let Some((live_sha, committed)) = line.split_once(' ') else {
                continue;
            };
            let Some(body) = git.try_run(&format!("log -1 --format=%B {live_sha}")) else {
                continue;
            };
            let Some(source_sha) = source_commit_of(&body) else {
                continue;
            };
            // Walking newest→oldest, a later (deeper) duplicate overwrites.
            set.insert(&source_sha, live_sha);
            if let Ok(seconds) = committed.parse::<i64>() {
                if let Some(at) = DateTime::from_timestamp(seconds, 0) {
                    set.last_published = Some(set.last_published.map_or(at, |t| t.max(at)));
                }
            }
        }
        tracing::info!(
            "recovered {} published release(s) from LIVE/main",
            set.len()
        );
        set
    }

    pub(crate) fn insert(&mut self, source_sha: &str, live_sha: &str) {
        self.entries
            .insert(source_sha.to_ascii_lowercase(), live_sha.to_string());
    }

    pub fn contains(&self, source_sha: &str) -> bool {
        self.entries.contains_key(&source_sha.to_ascii_lowercase())
    }

    pub fn live_commit(&self, source_sha: &str) -> Option<&str> {
        self.entries
            .get(&source_sha.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Committer time of the newest recovered LIVE commit.
    pub fn last_published(&self) -> Option<DateTime<Utc>> {
        self.last_published
    }
}

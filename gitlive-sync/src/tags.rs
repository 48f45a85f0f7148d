//! Collection and ordering of `live/*` release tags.

use gitlive_git::GitRunner;

use crate::error::SyncError;

/// Tag name prefix selecting releases for publication.
pub const LIVE_TAG_PREFIX: &str = "live/";

/// One release tag in the source repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    /// Full tag name, always starting with `live/`.
    pub name: String,
    /// Committer timestamp of the tagged commit (Unix seconds).
    pub timestamp: i64,
    /// Full 40-hex SHA of the tagged commit.
    pub full_sha: String,
    /// Abbreviated SHA used in commit subjects.
    pub short_sha: String,
}

impl TagRecord {
    /// Tag name as published on LIVE: the `live/` prefix stripped.
    pub fn display_name(&self) -> &str {
        remote_name(&self.name)
    }
}

/// Local `live/<X>` ↔ remote `<X>`; the one and only rename performed.
pub fn remote_name(local: &str) -> &str {
    local.strip_prefix(LIVE_TAG_PREFIX).unwrap_or(local)
}

/// List the workspace's `live/*` tags ordered ascending by committer
/// timestamp, ties broken by name. Tags whose committer timestamp cannot be
/// read are dropped with a warning.
pub fn collect(git: &GitRunner) -> Result<Vec<TagRecord>, SyncError> {
    let listing = git.run(&format!("tag --list {LIVE_TAG_PREFIX}*"))?;
    let mut records = Vec::new();

    for name in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let timestamp = git
            .try_run(&format!("log -1 --pretty=format:%ct {name}^{{}}"))
            .and_then(|out| out.trim().parse::<i64>().ok());
        let Some(timestamp) = timestamp else {
            tracing::warn!("skipping tag {name}: unreadable committer timestamp");
            continue;
        };

        let full_sha = git.run(&format!("rev-parse {name}^{{}}"))?;
        let short_sha = git
            .try_run(&format!("rev-parse --short {name}^{{}}"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| full_sha.chars().take(7).collect());

        records.push(TagRecord {
            name: name.to_string(),
            timestamp,
            full_sha,
            short_sha,
        });
    }

    records.sort_by(publication_order);
    Ok(records)
}

/// Ascending committer time; ties broken by name so history is a total order.
fn publication_order(a: &TagRecord, b: &TagRecord) -> std::cmp::Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then_with(|| a.name.cmp(&b.name))
}

//! The publishing engine.
//!
//! Reconciles the source's ordered `live/*` tags against what LIVE/main
//! already carries, then grafts a linear squashed history in a throwaway
//! workspace and pushes it. All history construction happens against
//! plumbing (`commit-tree`, `update-ref`, `tag -f`) so no working tree is
//! ever touched and every commit is a pure function of its inputs.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::Utc;

use gitlive_git::{GitRunner, Workspace, LIVE_REMOTE, SOURCE_REMOTE};

use crate::error::SyncError;
use crate::provenance::{self, Provenance, PublishedSet};
use crate::selector::{self, Rule};
use crate::tags::{self, TagRecord};

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

/// How to reconcile the tag list against the published set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Publish only tags after the newest already-published one.
    #[default]
    Incremental,
    /// Re-publish every tag whose source commit is missing from LIVE.
    Repair,
    /// Rebuild LIVE from scratch: delete its tags, start an orphan history.
    Nuke,
}

impl SyncMode {
    fn forces_push(self) -> bool {
        matches!(self, SyncMode::Repair | SyncMode::Nuke)
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Incremental => write!(f, "incremental"),
            SyncMode::Repair => write!(f, "repair"),
            SyncMode::Nuke => write!(f, "nuke"),
        }
    }
}

/// Inputs for one sync run.
#[derive(Debug)]
pub struct SyncOptions {
    /// Path of the private source repository.
    pub source_repo: PathBuf,
    /// Normalized (and possibly authenticated) LIVE URL.
    pub live_url: String,
    /// Ordered file-selection rules; empty publishes trees untouched.
    pub rules: Vec<Rule>,
    pub mode: SyncMode,
    /// Build everything but skip the push phase.
    pub dry_run: bool,
}

/// Outcome of a successful sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of tags (re)published this run.
    pub tags_published: usize,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run one sync. The workspace is released on every exit path; the LIVE
/// remote is only mutated in the push phase, so failures before it leave
/// LIVE untouched and any partial push converges on the next run.
pub fn sync(options: &SyncOptions) -> Result<SyncReport, SyncError> {
    tracing::info!(
        "syncing {} -> LIVE in {} mode{}",
        options.source_repo.display(),
        options.mode,
        if options.dry_run { " (dry run)" } else { "" }
    );

    let workspace = Workspace::create(&options.source_repo, &options.live_url)?;
    let report = run(workspace.runner(), options);
    sweep_temporary_branches(workspace.runner());
    report
}

fn run(git: &GitRunner, options: &SyncOptions) -> Result<SyncReport, SyncError> {
    git.run(&format!("fetch {SOURCE_REMOTE} --tags"))?;
    if git.try_run(&format!("fetch {LIVE_REMOTE} main --tags")).is_none() {
        tracing::debug!("LIVE main not fetchable; assuming a virgin target");
    }
    if git.try_run(&format!("ls-remote {LIVE_REMOTE}")).is_none() {
        return Err(SyncError::LiveUnreachable {
            detail: format!("ls-remote failed for {}", options.live_url),
        });
    }

    let published = PublishedSet::recover(git);
    let tag_list = tags::collect(git)?;
    if tag_list.is_empty() {
        tracing::info!("no live/* tags in the source; nothing to publish");
        return Ok(SyncReport { tags_published: 0 });
    }

    let Some(start) = start_index(&tag_list, &published, options.mode)? else {
        tracing::info!("every tag is already published; nothing to do");
        return Ok(SyncReport { tags_published: 0 });
    };
    tracing::debug!(
        "publishing {} of {} tag(s), starting at {}",
        tag_list.len() - start,
        tag_list.len(),
        tag_list.get(start).map_or("<end>", |t| t.name.as_str()),
    );

    let live_tip = match options.mode {
        SyncMode::Nuke => None,
        _ => {
            let tip = git
                .run(&format!("rev-parse refs/remotes/{LIVE_REMOTE}/main"))
                .map_err(|_| SyncError::LiveUnreachable {
                    detail: "LIVE/main is required but missing".to_string(),
                })?;
            Some(tip)
        }
    };

    let branch = format!("tmp-sync-{}-{}", Utc::now().timestamp(), std::process::id());
    if let Some(tip) = &live_tip {
        git.run(&format!("update-ref refs/heads/{branch} {tip}"))?;
    }

    let mut parent = live_tip;
    let mut prev_tag: Option<&str> = (start > 0).then(|| tag_list[start - 1].name.as_str());
    let mut created: Vec<(String, String)> = Vec::new();

    for record in &tag_list[start..] {
        let sha = publish_tag(git, record, prev_tag, parent.as_deref(), &options.rules, &branch)
            .map_err(|err| match err {
                SyncError::Git(source) => SyncError::Publish {
                    tag: record.name.clone(),
                    source,
                },
                other => other,
            })?;
        created.push((record.name.clone(), sha.clone()));
        parent = Some(sha);
        prev_tag = Some(record.name.as_str());
    }

    if options.dry_run {
        tracing::info!("dry run: would push {} tag(s) to LIVE", created.len());
    } else {
        push_phase(git, &tag_list, &published, &created, &branch, options.mode)?;
    }

    Ok(SyncReport {
        tags_published: created.len(),
    })
}

// ---------------------------------------------------------------------------
// Start-index decision
// ---------------------------------------------------------------------------

/// Where in the ordered tag list publication starts. `None` means nothing to
/// do (only possible in Repair mode with nothing missing).
fn start_index(
    tag_list: &[TagRecord],
    published: &PublishedSet,
    mode: SyncMode,
) -> Result<Option<usize>, SyncError> {
    if mode == SyncMode::Nuke {
        return Ok(Some(0));
    }
    if published.is_empty() {
        return Ok(Some(0));
    }
    match mode {
        SyncMode::Repair => Ok(tag_list
            .iter()
            .position(|t| !published.contains(&t.full_sha))),
        SyncMode::Incremental => {
            let Some(last) = tag_list
                .iter()
                .rposition(|t| published.contains(&t.full_sha))
            else {
                // LIVE only carries commits that no longer map to any tag;
                // append the whole list on top.
                return Ok(Some(0));
            };
            if let Some(gap) = tag_list[..last].iter().find(|t| !published.contains(&t.full_sha)) {
                return Err(SyncError::Divergence {
                    tag: gap.name.clone(),
                });
            }
            Ok(Some(last + 1))
        }
        SyncMode::Nuke => unreachable!("handled above"),
    }
}

// ---------------------------------------------------------------------------
// Publishing loop
// ---------------------------------------------------------------------------

fn publish_tag(
    git: &GitRunner,
    record: &TagRecord,
    prev_tag: Option<&str>,
    parent: Option<&str>,
    rules: &[Rule],
    branch: &str,
) -> Result<String, SyncError> {
    let mut tree = git.run(&format!("rev-parse {}^{{tree}}", record.name))?;
    if !rules.is_empty() {
        tree = selector::filter_tree(git, &tree, rules)?;
    }

    let commit_count = count_release_commits(git, prev_tag, &record.name)?;
    let message = provenance::format_message(
        record.display_name(),
        &record.short_sha,
        &Provenance {
            commit: record.full_sha.clone(),
            tag: record.name.clone(),
            date: Utc::now(),
            commit_count,
        },
    );

    let command = match parent {
        Some(parent) => format!("commit-tree {tree} -p {parent}"),
        None => format!("commit-tree {tree}"),
    };
    let sha = git.run_with_input(&command, &message)?;

    git.run(&format!("update-ref refs/heads/{branch} {sha}"))?;
    git.run(&format!("tag -f {} {sha}", record.name))?;
    tracing::info!("grafted {} as {}", record.name, &sha[..sha.len().min(7)]);
    Ok(sha)
}

/// Source commits in `prev..tag`, or in the tag's whole ancestry when there
/// is no usable previous tag.
fn count_release_commits(
    git: &GitRunner,
    prev_tag: Option<&str>,
    tag: &str,
) -> Result<usize, SyncError> {
    let range = match prev_tag {
        Some(prev) if git.try_run(&format!("rev-parse {prev}^{{}}")).is_some() => {
            format!("{prev}..{tag}")
        }
        _ => tag.to_string(),
    };
    let log = git.run(&format!("log --pretty=format:%H --reverse {range}"))?;
    Ok(log.lines().filter(|l| !l.trim().is_empty()).count())
}

// ---------------------------------------------------------------------------
// Push phase
// ---------------------------------------------------------------------------

fn push_phase(
    git: &GitRunner,
    tag_list: &[TagRecord],
    published: &PublishedSet,
    created: &[(String, String)],
    branch: &str,
    mode: SyncMode,
) -> Result<(), SyncError> {
    if mode == SyncMode::Nuke {
        delete_remote_tags(git);
    }

    let force = if mode.forces_push() { "+" } else { "" };
    git.run(&format!(
        "push {LIVE_REMOTE} {force}refs/heads/{branch}:refs/heads/main"
    ))?;
    tracing::info!("pushed LIVE/main");

    for (local, _) in created {
        let remote = tags::remote_name(local);
        git.run(&format!(
            "push {LIVE_REMOTE} {force}refs/tags/{local}:refs/tags/{remote}"
        ))?;
        tracing::info!("pushed tag {remote}");
    }

    normalize_remote_tags(git, tag_list, published, created, force);
    Ok(())
}

/// Nuke only: delete every tag on LIVE, best-effort.
fn delete_remote_tags(git: &GitRunner) {
    let Some(listing) = git.try_run(&format!("ls-remote --tags {LIVE_REMOTE}")) else {
        return;
    };
    let names: BTreeSet<String> = listing
        .lines()
        .filter_map(|line| {
            let (_, reference) = line.split_once('\t')?;
            let name = reference.strip_prefix("refs/tags/")?;
            Some(name.trim_end_matches("^{}").to_string())
        })
        .collect();
    for name in names {
        if git
            .try_run(&format!("push {LIVE_REMOTE} --delete refs/tags/{name}"))
            .is_none()
        {
            tracing::warn!("could not delete remote tag {name}");
        } else {
            tracing::info!("deleted remote tag {name}");
        }
    }
}

/// Ensure every tag in the full ordered list exists on LIVE: re-push tags
/// created this run if a push was lost, and carry over tags published by a
/// prior run. Failures here never fail the sync.
fn normalize_remote_tags(
    git: &GitRunner,
    tag_list: &[TagRecord],
    published: &PublishedSet,
    created: &[(String, String)],
    force: &str,
) {
    for record in tag_list {
        let remote = record.display_name();
        let present = git
            .try_run(&format!("ls-remote {LIVE_REMOTE} refs/tags/{remote}"))
            .is_some_and(|out| !out.trim().is_empty());
        if present {
            continue;
        }

        let command = if created.iter().any(|(local, _)| local == &record.name) {
            format!("push {LIVE_REMOTE} {force}refs/tags/{}:refs/tags/{remote}", record.name)
        } else if let Some(live_sha) = published.live_commit(&record.full_sha) {
            format!("push {LIVE_REMOTE} {force}{live_sha}:refs/tags/{remote}")
        } else {
            continue;
        };
        if git.try_run(&command).is_none() {
            tracing::warn!("normalization could not push tag {remote}");
        } else {
            tracing::info!("normalization pushed tag {remote}");
        }
    }
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

/// Delete our temporary branch and any stray `tmp-sync-*` left by earlier
/// aborted runs. Best-effort; the workspace directory goes away regardless.
fn sweep_temporary_branches(git: &GitRunner) {
    let Some(listing) =
        git.try_run("for-each-ref --format=%(refname:short) refs/heads/tmp-sync-*")
    else {
        return;
    };
    for branch in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if git.try_run(&format!("branch -D {branch}")).is_none() {
            tracing::debug!("could not delete temporary branch {branch}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

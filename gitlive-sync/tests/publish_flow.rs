//! End-to-end publishing scenarios against real repositories.
//!
//! Each test builds a private source repository and a bare LIVE repository in
//! temp directories, then drives the engine through the sync modes and
//! inspects LIVE through git itself.

use std::path::Path;

use tempfile::TempDir;

use gitlive_git::{quote, GitRunner};
use gitlive_sync::{engine, parse_rules, SyncError, SyncMode, SyncOptions};

// ---------------------------------------------------------------------------
// Repository fixtures
// ---------------------------------------------------------------------------

struct SourceRepo {
    dir: TempDir,
    git: GitRunner,
}

impl SourceRepo {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let git = GitRunner::new(dir.path());
        git.run("init").unwrap();
        git.run("config user.email dev@example.com").unwrap();
        git.run("config user.name Dev").unwrap();
        Self { dir, git }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, content: &str) {
        std::fs::write(self.dir.path().join(name), content).unwrap();
    }

    fn commit_all(&self, message: &str) {
        self.git.run("add -A").unwrap();
        self.git
            .run(&format!("commit -m {}", quote(message)))
            .unwrap();
    }

    fn tag(&self, name: &str) {
        self.git.run(&format!("tag {name}")).unwrap();
    }

    fn head_sha(&self) -> String {
        self.git.run("rev-parse HEAD").unwrap()
    }
}

struct LiveRepo {
    dir: TempDir,
    git: GitRunner,
}

impl LiveRepo {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let git = GitRunner::new(dir.path());
        git.run("init --bare").unwrap();
        git.run("symbolic-ref HEAD refs/heads/main").unwrap();
        Self { dir, git }
    }

    fn url(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    /// Place one human-made commit on main, the way a freshly created public
    /// repository often starts out.
    fn seed_empty_commit(&self) {
        let work = TempDir::new().unwrap();
        let git = GitRunner::new(work.path());
        git.run("init").unwrap();
        git.run("config user.email seed@example.com").unwrap();
        git.run("config user.name Seeder").unwrap();
        git.run("commit --allow-empty -m seed").unwrap();
        git.run(&format!("push {} HEAD:refs/heads/main", quote(&self.url())))
            .unwrap();
    }

    /// Push a handcrafted commit whose message carries a provenance block for
    /// `source_sha`, on top of whatever main currently holds.
    fn seed_published_commit(&self, source_sha: &str, tag: &str) {
        let work = TempDir::new().unwrap();
        let git = GitRunner::new(work.path());
        git.run("init").unwrap();
        git.run("config user.email seed@example.com").unwrap();
        git.run("config user.name Seeder").unwrap();
        if git
            .try_run(&format!("fetch {} main", quote(&self.url())))
            .is_some()
        {
            git.run("reset --hard FETCH_HEAD").unwrap();
        }
        let message = format!(
            "GitLive: publish {tag} commit {}\n\n// GitLive\ncommit = {source_sha}\n\
             tag = live/{tag}\ndate = 2024-06-01T12:34:56Z\ncommit-count = 1\n",
            &source_sha[..7]
        );
        git.run_with_input("commit --allow-empty -F -", &message)
            .unwrap();
        git.run(&format!("push {} HEAD:refs/heads/main", quote(&self.url())))
            .unwrap();
    }

    fn tags(&self) -> Vec<String> {
        self.git
            .run("tag --list")
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn main_commit_count(&self) -> usize {
        self.git
            .run("rev-list --count main")
            .unwrap()
            .trim()
            .parse()
            .unwrap()
    }

    fn main_shas(&self) -> Vec<String> {
        self.git
            .run("rev-list main")
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn message_of(&self, rev: &str) -> String {
        self.git.run(&format!("log -1 --format=%B {rev}")).unwrap()
    }

    fn file_at(&self, rev: &str, path: &str) -> Option<String> {
        self.git.try_run(&format!("show {rev}:{path}"))
    }

    /// Stable snapshot of every ref, for before/after comparisons.
    fn ref_snapshot(&self) -> String {
        self.git.try_run("for-each-ref").unwrap_or_default()
    }
}

fn options(source: &SourceRepo, live: &LiveRepo, mode: SyncMode) -> SyncOptions {
    SyncOptions {
        source_repo: source.path().to_path_buf(),
        live_url: live.url(),
        rules: Vec::new(),
        mode,
        dry_run: false,
    }
}

fn three_release_source() -> SourceRepo {
    let source = SourceRepo::new();
    source.write("content.txt", "line 1\n");
    source.commit_all("first release");
    source.tag("live/1.0.0");
    source.write("content.txt", "line 1\nline 2\n");
    source.commit_all("second release");
    source.tag("live/1.1.0");
    source.write("content.txt", "line 1\nline 2\nline 3\n");
    source.commit_all("third release");
    source.tag("live/1.2.0");
    source
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn single_tag_publishes_onto_a_seeded_live() {
    let source = SourceRepo::new();
    source.write("content.txt", "line 1\n");
    source.commit_all("first release");
    source.tag("live/1.0.0");

    let live = LiveRepo::new();
    live.seed_empty_commit();

    let report = engine::sync(&options(&source, &live, SyncMode::Incremental)).unwrap();
    assert_eq!(report.tags_published, 1);
    assert_eq!(live.main_commit_count(), 2);
    assert_eq!(live.tags(), vec!["1.0.0"]);
    assert_eq!(live.file_at("1.0.0", "content.txt").unwrap(), "line 1");

    let message = live.message_of("main");
    assert!(message.starts_with("GitLive: publish 1.0.0 commit "));
    assert!(message.contains("// GitLive"));
    assert!(message.contains(&format!("commit = {}", source.head_sha())));
    assert!(message.contains("tag = live/1.0.0"));
    assert!(message.contains("commit-count = 1"));
}

#[test]
fn three_tags_publish_in_sequence() {
    let source = three_release_source();
    let live = LiveRepo::new();
    live.seed_empty_commit();

    let report = engine::sync(&options(&source, &live, SyncMode::Incremental)).unwrap();
    assert_eq!(report.tags_published, 3);
    assert_eq!(live.main_commit_count(), 4);

    let mut tags = live.tags();
    tags.sort();
    assert_eq!(tags, vec!["1.0.0", "1.1.0", "1.2.0"]);
    assert_eq!(
        live.file_at("1.2.0", "content.txt").unwrap(),
        "line 1\nline 2\nline 3"
    );
    assert_eq!(live.file_at("1.0.0", "content.txt").unwrap(), "line 1");
}

#[test]
fn incremental_resume_publishes_only_the_new_tag() {
    let source = SourceRepo::new();
    source.write("content.txt", "line 1\n");
    source.commit_all("first release");
    source.tag("live/1.0.0");

    let live = LiveRepo::new();
    live.seed_empty_commit();

    let first = engine::sync(&options(&source, &live, SyncMode::Incremental)).unwrap();
    assert_eq!(first.tags_published, 1);

    source.write("content.txt", "line 1\nline 2\n");
    source.commit_all("second release");
    source.tag("live/1.1.0");

    let second = engine::sync(&options(&source, &live, SyncMode::Incremental)).unwrap();
    assert_eq!(second.tags_published, 1);

    let mut tags = live.tags();
    tags.sort();
    assert_eq!(tags, vec!["1.0.0", "1.1.0"]);
    assert_eq!(live.main_commit_count(), 3);
}

#[test]
fn running_incremental_twice_publishes_nothing_new() {
    let source = three_release_source();
    let live = LiveRepo::new();
    live.seed_empty_commit();

    engine::sync(&options(&source, &live, SyncMode::Incremental)).unwrap();
    let before = live.ref_snapshot();

    let again = engine::sync(&options(&source, &live, SyncMode::Incremental)).unwrap();
    assert_eq!(again.tags_published, 0);
    assert_eq!(live.ref_snapshot(), before);
}

#[test]
fn repair_with_nothing_missing_is_a_no_op() {
    let source = three_release_source();
    let live = LiveRepo::new();
    live.seed_empty_commit();

    engine::sync(&options(&source, &live, SyncMode::Incremental)).unwrap();
    let report = engine::sync(&options(&source, &live, SyncMode::Repair)).unwrap();
    assert_eq!(report.tags_published, 0);
}

#[test]
fn remove_rule_excludes_the_file_from_the_published_tree() {
    let source = SourceRepo::new();
    source.write("content.txt", "line 1\n");
    source.write("secret.txt", "hunter2\n");
    source.commit_all("release with secret");
    source.tag("live/1.0.0");

    let live = LiveRepo::new();
    live.seed_empty_commit();

    let mut opts = options(&source, &live, SyncMode::Incremental);
    opts.rules = parse_rules(&["- secret.txt".to_string()]).unwrap();
    engine::sync(&opts).unwrap();

    assert_eq!(live.tags(), vec!["1.0.0"]);
    assert_eq!(live.file_at("1.0.0", "content.txt").unwrap(), "line 1");
    assert!(live.file_at("1.0.0", "secret.txt").is_none());
}

#[test]
fn nuke_deletes_remote_tags_and_rebuilds_an_orphan_history() {
    let source = SourceRepo::new();
    source.write("content.txt", "line 1\n");
    source.commit_all("first release");
    source.tag("live/1.0.0");

    let live = LiveRepo::new();
    let first = engine::sync(&options(&source, &live, SyncMode::Nuke)).unwrap();
    assert_eq!(first.tags_published, 1);
    let old_tag_sha = live.git.run("rev-parse 1.0.0").unwrap();

    // commit timestamps have one-second granularity; make sure the rebuilt
    // commits cannot collide with the first run's
    std::thread::sleep(std::time::Duration::from_millis(1100));

    source.write("content.txt", "line 1\nline 2\n");
    source.commit_all("second release");
    source.tag("live/1.1.0");

    let second = engine::sync(&options(&source, &live, SyncMode::Nuke)).unwrap();
    assert_eq!(second.tags_published, 2);

    let mut tags = live.tags();
    tags.sort();
    assert_eq!(tags, vec!["1.0.0", "1.1.0"]);
    assert_eq!(live.main_commit_count(), 2);
    for sha in live.main_shas() {
        assert!(
            live.message_of(&sha).contains("// GitLive"),
            "commit {sha} is missing its provenance block"
        );
    }

    // the old tag was deleted and republished against the new history
    let new_tag_sha = live.git.run("rev-parse 1.0.0").unwrap();
    assert_ne!(new_tag_sha, old_tag_sha);
}

#[test]
fn nuke_against_a_virgin_live_succeeds() {
    let source = three_release_source();
    let live = LiveRepo::new();

    let report = engine::sync(&options(&source, &live, SyncMode::Nuke)).unwrap();
    assert_eq!(report.tags_published, 3);
    assert_eq!(live.main_commit_count(), 3);

    // orphan root: the first published commit has no parent
    let root = live.main_shas().pop().unwrap();
    assert!(live.git.try_run(&format!("rev-parse {root}^")).is_none());
}

#[test]
fn divergence_in_the_published_prefix_fails_and_leaves_live_untouched() {
    let source = SourceRepo::new();
    source.write("content.txt", "line 1\n");
    source.commit_all("first release");
    source.tag("live/1.0.0");
    let first_sha = source.head_sha();
    source.write("content.txt", "line 1\nline 2\n");
    source.commit_all("second release");
    source.tag("live/2.0.0");
    source.write("content.txt", "line 1\nline 2\nline 3\n");
    source.commit_all("third release");
    source.tag("live/3.0.0");
    let third_sha = source.head_sha();

    let live = LiveRepo::new();
    live.seed_published_commit(&first_sha, "1.0.0");
    live.seed_published_commit(&third_sha, "3.0.0");
    let before = live.ref_snapshot();

    let err = engine::sync(&options(&source, &live, SyncMode::Incremental)).unwrap_err();
    match &err {
        SyncError::Divergence { tag } => assert_eq!(tag, "live/2.0.0"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 5);
    assert_eq!(live.ref_snapshot(), before);
}

#[test]
fn zero_live_tags_is_a_benign_success() {
    let source = SourceRepo::new();
    source.write("content.txt", "line 1\n");
    source.commit_all("untagged work");

    let live = LiveRepo::new();
    let report = engine::sync(&options(&source, &live, SyncMode::Incremental)).unwrap();
    assert_eq!(report.tags_published, 0);
    assert_eq!(live.ref_snapshot(), "");
}

#[test]
fn dry_run_builds_everything_but_mutates_nothing() {
    let source = SourceRepo::new();
    source.write("content.txt", "line 1\n");
    source.commit_all("first release");
    source.tag("live/1.0.0");

    let live = LiveRepo::new();
    live.seed_empty_commit();
    let before = live.ref_snapshot();

    let mut opts = options(&source, &live, SyncMode::Incremental);
    opts.dry_run = true;
    let report = engine::sync(&opts).unwrap();

    assert_eq!(report.tags_published, 1);
    assert_eq!(live.ref_snapshot(), before);
    assert!(live.tags().is_empty());
}

#[test]
fn incremental_against_an_unreachable_live_fails_with_exit_3() {
    let source = SourceRepo::new();
    source.write("content.txt", "line 1\n");
    source.commit_all("first release");
    source.tag("live/1.0.0");

    let missing = TempDir::new().unwrap();
    let gone = missing.path().join("nowhere.git");
    let err = engine::sync(&SyncOptions {
        source_repo: source.path().to_path_buf(),
        live_url: gone.to_string_lossy().into_owned(),
        rules: Vec::new(),
        mode: SyncMode::Incremental,
        dry_run: false,
    })
    .unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn incremental_against_a_virgin_live_requires_main() {
    let source = SourceRepo::new();
    source.write("content.txt", "line 1\n");
    source.commit_all("first release");
    source.tag("live/1.0.0");

    let live = LiveRepo::new();
    let err = engine::sync(&options(&source, &live, SyncMode::Incremental)).unwrap_err();
    assert!(matches!(err, SyncError::LiveUnreachable { .. }));
    assert_eq!(err.exit_code(), 3);
}

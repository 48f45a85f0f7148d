//! GitLive — one-way publisher of release snapshots.
//!
//! # Usage
//!
//! ```text
//! gitlive [--url=URL] [--user=NAME] [--password=TOK]
//!         [--incremental | --repair | --nuke] [--full]
//!         [--dry-run] [-v | -vv | --very-verbose]
//! ```
//!
//! Run inside the source repository. Tags matching `live/<name>` are squashed
//! into single commits on the LIVE repository's `main`, with the `live/`
//! prefix stripped from published tag names. Configuration falls back from
//! flags to `GITLIVE_*` environment variables to `gitlive.z0` in the current
//! directory.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use gitlive_core::{config, urlx, ConfigReader, Z0Document};
use gitlive_git::GitRunner;
use gitlive_sync::{engine, parse_rules, SyncError, SyncMode, SyncOptions, SyncReport};

/// Config file looked up in the current working directory.
const CONFIG_FILE: &str = "gitlive.z0";

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gitlive",
    version,
    about = "Publish squashed release snapshots to a public LIVE repository",
    long_about = None,
)]
struct Cli {
    /// LIVE repository URL (also GITLIVE_URL, or `url` in gitlive.z0).
    #[arg(long)]
    url: Option<String>,

    /// User name injected into http(s) LIVE URLs.
    #[arg(long)]
    user: Option<String>,

    /// Password or token injected into http(s) LIVE URLs.
    #[arg(long)]
    password: Option<String>,

    /// Build the new history but push nothing.
    #[arg(long)]
    dry_run: bool,

    /// Publish only tags newer than the last published one (default).
    #[arg(long)]
    incremental: bool,

    /// Re-publish every tag missing from LIVE.
    #[arg(long)]
    repair: bool,

    /// Legacy alias of --repair.
    #[arg(long)]
    full: bool,

    /// Delete LIVE's tags and rebuild its history from scratch.
    #[arg(long)]
    nuke: bool,

    /// More logging (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Maximum logging detail.
    #[arg(long)]
    very_verbose: bool,
}

impl Cli {
    /// Explicit flag precedence: nuke > repair (and its `--full` alias) >
    /// incremental.
    fn mode(&self) -> SyncMode {
        if self.nuke {
            SyncMode::Nuke
        } else if self.repair || self.full {
            SyncMode::Repair
        } else {
            SyncMode::Incremental
        }
    }

    /// The highest verbosity flag present wins.
    fn verbosity(&self) -> u8 {
        if self.very_verbose {
            self.verbose.max(2)
        } else {
            self.verbose
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbosity());

    match run(&cli) {
        Ok(report) => {
            if cli.dry_run {
                println!("would push {} tags", report.tags_published);
            } else {
                println!("✓ published {} tag(s) to LIVE", report.tags_published);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = err
                .downcast_ref::<SyncError>()
                .map_or(11, SyncError::exit_code);
            ExitCode::from(code as u8)
        }
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn run(cli: &Cli) -> Result<SyncReport> {
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;

    let source = GitRunner::new(&cwd);
    if source.try_run("rev-parse --git-dir").is_none() {
        return Err(SyncError::Detection { path: cwd }.into());
    }

    let file = load_config_file(&cwd)?;
    let reader = ConfigReader::new(cli_values(cli), std::env::vars().collect(), file);

    let raw_url = reader.url().ok_or(SyncError::MissingUrl)?;
    let user = reader.user().unwrap_or_default();
    let password = reader.password().unwrap_or_default();
    let live_url = urlx::authenticate(&urlx::normalize(&raw_url), &user, &password);

    let rules = parse_rules(&file_rules(&reader))?;
    tracing::debug!(
        "resolved LIVE url from configuration; {} selection rule(s), {} mode",
        rules.len(),
        cli.mode()
    );

    let options = SyncOptions {
        source_repo: cwd,
        live_url,
        rules,
        mode: cli.mode(),
        dry_run: cli.dry_run,
    };
    Ok(engine::sync(&options)?)
}

/// CLI source for the config reader: raw `--name=value` pairs from argv per
/// the documented contract, with clap-parsed values appended so the
/// space-separated form resolves too.
fn cli_values(cli: &Cli) -> Vec<(String, String)> {
    let argv: Vec<String> = std::env::args().collect();
    let mut pairs = config::cli_pairs(&argv);
    for (name, value) in [
        ("url", &cli.url),
        ("user", &cli.user),
        ("password", &cli.password),
    ] {
        if let Some(value) = value {
            pairs.push((name.to_string(), value.clone()));
        }
    }
    pairs
}

fn load_config_file(dir: &Path) -> Result<Option<Z0Document>> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let doc = Z0Document::parse(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(doc))
}

/// `files` rule strings from the config file, in order.
fn file_rules(reader: &ConfigReader) -> Vec<String> {
    let Some(doc) = reader.file() else {
        return Vec::new();
    };
    doc.get("files")
        .items()
        .iter()
        .map(|rule| rule.optional(""))
        .filter(|rule| !rule.is_empty())
        .collect()
}

fn init_tracing(verbosity: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

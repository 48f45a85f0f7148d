//! Layered configuration: CLI arguments, environment, Z0 file.
//!
//! Every key carries a security level deciding which sources may supply it;
//! where a level permits several sources, precedence is CLI > environment >
//! file. Sources are passed in explicitly (argument pairs and an environment
//! snapshot) so tests never touch the process environment.

use crate::z0::{keys_equal, normalize_key, Z0Document};

/// Prefix for environment variable lookups: `GITLIVE_<KEY>`.
pub const ENV_PREFIX: &str = "GITLIVE_";

/// Which sources may supply a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    /// Environment only. For values that must never appear on a command line
    /// or in a file.
    SecureStrict,
    /// CLI and environment; never the config file.
    SecureFlexible,
    /// Any source.
    All,
}

impl SecurityLevel {
    fn allows_cli(self) -> bool {
        !matches!(self, SecurityLevel::SecureStrict)
    }

    fn allows_env(self) -> bool {
        true
    }

    fn allows_file(self) -> bool {
        matches!(self, SecurityLevel::All)
    }
}

/// Merges configuration values from three sources by priority.
#[derive(Debug, Default)]
pub struct ConfigReader {
    cli: Vec<(String, String)>,
    env: Vec<(String, String)>,
    file: Option<Z0Document>,
}

impl ConfigReader {
    pub fn new(
        cli: Vec<(String, String)>,
        env: Vec<(String, String)>,
        file: Option<Z0Document>,
    ) -> Self {
        Self { cli, env, file }
    }

    /// Look up `name` honoring `level` and source precedence.
    pub fn value(&self, name: &str, level: SecurityLevel) -> Option<String> {
        if level.allows_cli() {
            if let Some(v) = self.from_cli(name) {
                return Some(v);
            }
        }
        if level.allows_env() {
            if let Some(v) = self.from_env(name) {
                return Some(v);
            }
        }
        if level.allows_file() {
            if let Some(v) = self.from_file(name) {
                return Some(v);
            }
        }
        None
    }

    /// The LIVE repository URL; `public-url` is accepted from older configs.
    pub fn url(&self) -> Option<String> {
        self.value("url", SecurityLevel::All)
            .or_else(|| self.value("public-url", SecurityLevel::All))
    }

    pub fn user(&self) -> Option<String> {
        self.value("user", SecurityLevel::All)
    }

    /// Never readable from the Z0 file.
    pub fn password(&self) -> Option<String> {
        self.value("password", SecurityLevel::SecureFlexible)
    }

    /// The parsed config file, for keys read structurally (the `files` rule
    /// array).
    pub fn file(&self) -> Option<&Z0Document> {
        self.file.as_ref()
    }

    fn from_cli(&self, name: &str) -> Option<String> {
        self.cli
            .iter()
            .find(|(k, _)| keys_equal(k, name))
            .map(|(_, v)| v.clone())
    }

    fn from_env(&self, name: &str) -> Option<String> {
        let primary = format!(
            "{ENV_PREFIX}{}",
            name.replace('-', "_").to_ascii_uppercase()
        );
        if let Some((_, v)) = self.env.iter().find(|(k, _)| *k == primary) {
            return Some(v.clone());
        }
        // Fallback: case/separator-insensitive scan.
        let wanted = normalize_key(&primary);
        self.env
            .iter()
            .find(|(k, _)| normalize_key(k) == wanted)
            .map(|(_, v)| v.clone())
    }

    fn from_file(&self, name: &str) -> Option<String> {
        self.file
            .as_ref()
            .and_then(|doc| doc.get(name).value().map(str::to_string))
    }
}

/// Extract `--name=value` pairs from raw command-line arguments. Arguments
/// without `=` or without the `--` prefix are ignored here; they belong to
/// the flag parser.
pub fn cli_pairs(args: &[String]) -> Vec<(String, String)> {
    args.iter()
        .filter_map(|arg| {
            let rest = arg.strip_prefix("--")?;
            let (name, value) = rest.split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

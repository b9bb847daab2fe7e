use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use cloner_provisioner::PartialPolicy;

/// Repository cloned into every workspace unless configured otherwise.
pub const DEFAULT_SOURCE_REPO: &str = "git@github.com:dharshan-kumarj/Cratoss.git";

/// How `/stream` produces milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// Relay the phases the provisioning engine publishes.
    #[default]
    Live,
    /// Replay the fixed timed sequence, independent of any real run.
    Scripted,
}

impl FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(ProgressMode::Live),
            "scripted" => Ok(ProgressMode::Scripted),
            other => Err(format!(
                "unknown progress mode '{}' (expected 'live' or 'scripted')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub workspace_root: PathBuf,
    pub source_repo: String,
    pub git_program: String,
    pub editor_program: String,
    pub clone_timeout_secs: u64,
    pub editor_timeout_secs: u64,
    pub progress_mode: ProgressMode,
    pub milestone_interval_ms: u64,
    pub stream_timeout_secs: u64,
    pub partial_policy: PartialPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            workspace_root: PathBuf::from("."),
            source_repo: DEFAULT_SOURCE_REPO.to_string(),
            git_program: "git".to_string(),
            editor_program: "code".to_string(),
            clone_timeout_secs: 600,
            editor_timeout_secs: 30,
            progress_mode: ProgressMode::Live,
            milestone_interval_ms: 1000,
            stream_timeout_secs: 660,
            partial_policy: PartialPolicy::Reject,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value '{}' for {}: {}", raw, key, e)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from `CLONER_*` variables served by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            bind_addr: lookup("CLONER_BIND").unwrap_or(defaults.bind_addr),
            workspace_root: lookup("CLONER_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            source_repo: lookup("CLONER_SOURCE_REPO").unwrap_or(defaults.source_repo),
            git_program: lookup("CLONER_GIT").unwrap_or(defaults.git_program),
            editor_program: lookup("CLONER_EDITOR").unwrap_or(defaults.editor_program),
            clone_timeout_secs: parse_var(
                &lookup,
                "CLONER_CLONE_TIMEOUT",
                defaults.clone_timeout_secs,
            )?,
            editor_timeout_secs: parse_var(
                &lookup,
                "CLONER_EDITOR_TIMEOUT",
                defaults.editor_timeout_secs,
            )?,
            progress_mode: parse_var(&lookup, "CLONER_PROGRESS_MODE", defaults.progress_mode)?,
            milestone_interval_ms: parse_var(
                &lookup,
                "CLONER_MILESTONE_INTERVAL_MS",
                defaults.milestone_interval_ms,
            )?,
            stream_timeout_secs: parse_var(
                &lookup,
                "CLONER_STREAM_TIMEOUT",
                defaults.stream_timeout_secs,
            )?,
            partial_policy: parse_var(&lookup, "CLONER_ON_PARTIAL", defaults.partial_policy)?,
        })
    }

    /// Zero disables the clone timeout.
    pub fn clone_timeout(&self) -> Option<Duration> {
        (self.clone_timeout_secs > 0).then(|| Duration::from_secs(self.clone_timeout_secs))
    }

    /// Zero disables the editor timeout.
    pub fn editor_timeout(&self) -> Option<Duration> {
        (self.editor_timeout_secs > 0).then(|| Duration::from_secs(self.editor_timeout_secs))
    }

    pub fn milestone_interval(&self) -> Duration {
        Duration::from_millis(self.milestone_interval_ms)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }
}

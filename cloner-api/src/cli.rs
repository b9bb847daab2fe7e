use std::path::PathBuf;

use clap::Parser;
use cloner_provisioner::PartialPolicy;

use crate::config::{Config, ProgressMode};

/// Command-line overrides; anything left unset keeps its `CLONER_*` value.
#[derive(Debug, Parser)]
#[command(name = "cloner")]
#[command(about = "Provision per-user workspaces by cloning a repository on demand")]
#[command(version)]
pub struct Cli {
    /// Address to listen on
    #[arg(long)]
    pub bind: Option<String>,

    /// Directory that holds one workspace per user
    #[arg(long)]
    pub workspace_root: Option<PathBuf>,

    /// Repository cloned into new workspaces
    #[arg(long)]
    pub source_repo: Option<String>,

    /// git executable
    #[arg(long)]
    pub git: Option<String>,

    /// Editor executable used by "open in editor"
    #[arg(long)]
    pub editor: Option<String>,

    /// Seconds before a clone is killed (0 disables)
    #[arg(long)]
    pub clone_timeout: Option<u64>,

    /// `live` or `scripted`
    #[arg(long)]
    pub progress_mode: Option<ProgressMode>,

    /// What to do with a non-empty directory lacking metadata: `reject` or `wipe`
    #[arg(long)]
    pub on_partial: Option<PartialPolicy>,
}

impl Cli {
    pub fn apply(self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(root) = self.workspace_root {
            config.workspace_root = root;
        }
        if let Some(repo) = self.source_repo {
            config.source_repo = repo;
        }
        if let Some(git) = self.git {
            config.git_program = git;
        }
        if let Some(editor) = self.editor {
            config.editor_program = editor;
        }
        if let Some(secs) = self.clone_timeout {
            config.clone_timeout_secs = secs;
        }
        if let Some(mode) = self.progress_mode {
            config.progress_mode = mode;
        }
        if let Some(policy) = self.on_partial {
            config.partial_policy = policy;
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use cloner_core::CancellationToken;
use cloner_provisioner::{
    CommandEditor, EditorLauncher, GitCli, Provisioner, WorkspaceLocator,
};

use crate::config::{Config, ProgressMode};

#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub mode: ProgressMode,
    pub milestone_interval: Duration,
    pub wait_limit: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            mode: ProgressMode::Live,
            milestone_interval: Duration::from_secs(1),
            wait_limit: Duration::from_secs(660),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub provisioner: Provisioner,
    pub editor: Arc<dyn EditorLauncher>,
    pub streams: StreamSettings,
}

impl AppState {
    pub fn new(
        provisioner: Provisioner,
        editor: Arc<dyn EditorLauncher>,
        streams: StreamSettings,
    ) -> Self {
        Self {
            provisioner,
            editor,
            streams,
        }
    }

    /// Wire the real git and editor executables from configuration.
    /// Cancelling `shutdown` kills any running clone or editor launch.
    pub fn from_config(config: &Config, shutdown: CancellationToken) -> Self {
        let git = GitCli::new(config.git_program.clone(), config.clone_timeout());
        let provisioner = Provisioner::builder(
            WorkspaceLocator::new(config.workspace_root.clone()),
            Arc::new(git),
            config.source_repo.clone(),
        )
        .partial_policy(config.partial_policy)
        .shutdown_token(shutdown.clone())
        .build();

        let editor = CommandEditor::new(config.editor_program.clone(), config.editor_timeout())
            .with_cancellation(shutdown);

        Self::new(
            provisioner,
            Arc::new(editor),
            StreamSettings {
                mode: config.progress_mode,
                milestone_interval: config.milestone_interval(),
                wait_limit: config.stream_timeout(),
            },
        )
    }
}

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use cloner_core::{run_command_quiet, CancellationToken};

use crate::error::EditorError;

/// Opens a workspace directory in an external editor.
#[async_trait]
pub trait EditorLauncher: Send + Sync {
    async fn open(&self, path: &Path) -> Result<(), EditorError>;
}

/// Launches an editor executable with the workspace path as its last argument.
/// Editor output is discarded.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl CommandEditor {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Extra arguments placed before the workspace path.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Tie launches to an outer cancellation token (usually server shutdown).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl EditorLauncher for CommandEditor {
    async fn open(&self, path: &Path) -> Result<(), EditorError> {
        let mut args = self.args.clone();
        args.push(path.to_string_lossy().into_owned());

        run_command_quiet(&self.program, &args, self.timeout, &self.cancel).await?;
        Ok(())
    }
}

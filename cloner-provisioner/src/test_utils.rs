//! In-process stand-ins for the external tools, for tests in this crate and
//! downstream crates (enable the `test-utils` feature).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cloner_core::CancellationToken;

use crate::editor::EditorLauncher;
use crate::error::{EditorError, ProvisionError, Result};
use crate::vcs::VersionControl;
use crate::workspace::METADATA_DIR;

#[derive(Debug, Clone)]
enum CloneBehavior {
    Succeed,
    Fail(String),
    WriteFilesThenFail(String),
    SkipMetadata,
}

/// Records every clone request and simulates the outcome on disk.
#[derive(Debug, Clone)]
pub struct FakeVcs {
    behavior: CloneBehavior,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl FakeVcs {
    fn with_behavior(behavior: CloneBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Writes a metadata directory and a README into the destination.
    pub fn succeeding() -> Self {
        Self::with_behavior(CloneBehavior::Succeed)
    }

    /// Fails without touching the destination.
    pub fn failing(reason: &str) -> Self {
        Self::with_behavior(CloneBehavior::Fail(reason.to_string()))
    }

    /// Leaves a stray file in the destination, then fails.
    pub fn writing_then_failing(reason: &str) -> Self {
        Self::with_behavior(CloneBehavior::WriteFilesThenFail(reason.to_string()))
    }

    /// Succeeds but never writes metadata.
    pub fn without_metadata() -> Self {
        Self::with_behavior(CloneBehavior::SkipMetadata)
    }

    /// Sleep before acting; cancellation during the sleep is honoured.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().expect("fake vcs lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("fake vcs lock").len()
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn clone_repo(
        &self,
        source: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.calls
            .lock()
            .expect("fake vcs lock")
            .push((source.to_string(), dest.to_path_buf()));

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(ProvisionError::Cancelled(format!("clone of {} cancelled", source)));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let io = |e: std::io::Error| ProvisionError::Clone(e.to_string());
        match &self.behavior {
            CloneBehavior::Succeed => {
                std::fs::create_dir_all(dest.join(METADATA_DIR)).map_err(io)?;
                std::fs::write(dest.join("README.md"), source).map_err(io)?;
                Ok(())
            }
            CloneBehavior::Fail(reason) => Err(ProvisionError::Clone(reason.clone())),
            CloneBehavior::WriteFilesThenFail(reason) => {
                std::fs::write(dest.join("partial.pack"), b"incomplete").map_err(io)?;
                Err(ProvisionError::Clone(reason.clone()))
            }
            CloneBehavior::SkipMetadata => {
                std::fs::write(dest.join("README.md"), source).map_err(io)?;
                Ok(())
            }
        }
    }
}

/// Records opened paths instead of launching anything.
#[derive(Debug, Clone, Default)]
pub struct FakeEditor {
    failure: Option<String>,
    opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().expect("fake editor lock").clone()
    }
}

#[async_trait]
impl EditorLauncher for FakeEditor {
    async fn open(&self, path: &Path) -> std::result::Result<(), EditorError> {
        self.opened
            .lock()
            .expect("fake editor lock")
            .push(path.to_path_buf());

        match &self.failure {
            Some(reason) => Err(EditorError::Launch(reason.clone())),
            None => Ok(()),
        }
    }
}

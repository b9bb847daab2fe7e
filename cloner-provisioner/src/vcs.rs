use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use cloner_core::{run_command, CancellationToken};

use crate::error::{ProvisionError, Result};

/// The version-control tool used to populate a workspace.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Clone `source` into `dest`, which exists and is empty.
    async fn clone_repo(&self, source: &str, dest: &Path, cancel: &CancellationToken)
        -> Result<()>;
}

/// Clones by running the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    timeout: Option<Duration>,
}

impl GitCli {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git", Some(Duration::from_secs(600)))
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn clone_repo(
        &self,
        source: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        run_command(
            &self.program,
            &[
                OsStr::new("clone"),
                OsStr::new("--"),
                OsStr::new(source),
                dest.as_os_str(),
            ],
            self.timeout,
            cancel,
        )
        .await
        .map_err(ProvisionError::from_clone)
    }
}

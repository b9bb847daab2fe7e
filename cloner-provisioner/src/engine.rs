use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use cloner_core::CancellationToken;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{ProvisionError, Result};
use crate::progress::{ProgressHub, ProgressPhase};
use crate::vcs::VersionControl;
use crate::workspace::{WorkspaceId, WorkspaceLocator, WorkspaceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The workspace was already provisioned; nothing was touched.
    AlreadyExists,
    /// The directory was created and the repository cloned into it.
    Created,
}

/// What to do with a non-empty workspace directory that has no
/// version-control metadata, typically left behind by a failed clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialPolicy {
    /// Fail with [`ProvisionError::PartialWorkspace`] and leave the directory alone.
    #[default]
    Reject,
    /// Remove the directory and clone afresh.
    Wipe,
}

impl FromStr for PartialPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(PartialPolicy::Reject),
            "wipe" => Ok(PartialPolicy::Wipe),
            other => Err(format!(
                "unknown partial workspace policy '{}' (expected 'reject' or 'wipe')",
                other
            )),
        }
    }
}

impl fmt::Display for PartialPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialPolicy::Reject => f.write_str("reject"),
            PartialPolicy::Wipe => f.write_str("wipe"),
        }
    }
}

type InFlight = Shared<BoxFuture<'static, Result<ProvisionOutcome>>>;

struct Inner {
    locator: WorkspaceLocator,
    vcs: Arc<dyn VersionControl>,
    source_repo: String,
    hub: ProgressHub,
    partial_policy: PartialPolicy,
    shutdown: CancellationToken,
    in_flight: Mutex<HashMap<WorkspaceId, InFlight>>,
}

/// Creates workspaces and clones the source repository into them.
///
/// Runs are single-flight per identifier: a caller arriving while a run is
/// in progress awaits that run and receives its result. Each run executes on
/// its own task, so a dropped request never abandons a clone halfway.
#[derive(Clone)]
pub struct Provisioner {
    inner: Arc<Inner>,
}

pub struct ProvisionerBuilder {
    locator: WorkspaceLocator,
    vcs: Arc<dyn VersionControl>,
    source_repo: String,
    hub: ProgressHub,
    partial_policy: PartialPolicy,
    shutdown: CancellationToken,
}

impl ProvisionerBuilder {
    pub fn hub(mut self, hub: ProgressHub) -> Self {
        self.hub = hub;
        self
    }

    pub fn partial_policy(mut self, policy: PartialPolicy) -> Self {
        self.partial_policy = policy;
        self
    }

    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn build(self) -> Provisioner {
        Provisioner {
            inner: Arc::new(Inner {
                locator: self.locator,
                vcs: self.vcs,
                source_repo: self.source_repo,
                hub: self.hub,
                partial_policy: self.partial_policy,
                shutdown: self.shutdown,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl Provisioner {
    pub fn builder(
        locator: WorkspaceLocator,
        vcs: Arc<dyn VersionControl>,
        source_repo: impl Into<String>,
    ) -> ProvisionerBuilder {
        ProvisionerBuilder {
            locator,
            vcs,
            source_repo: source_repo.into(),
            hub: ProgressHub::new(),
            partial_policy: PartialPolicy::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn locator(&self) -> &WorkspaceLocator {
        &self.inner.locator
    }

    pub fn hub(&self) -> &ProgressHub {
        &self.inner.hub
    }

    pub fn source_repo(&self) -> &str {
        &self.inner.source_repo
    }

    pub fn exists(&self, id: &WorkspaceId) -> bool {
        self.inner.locator.exists(id)
    }

    /// Kill running clones and fail their runs with `Cancelled`.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Provision the workspace for `id`, or report that it already exists.
    pub async fn provision(&self, id: &WorkspaceId) -> Result<ProvisionOutcome> {
        let run = {
            let mut in_flight = self.inner.in_flight.lock().await;
            match in_flight.get(id) {
                Some(run) => {
                    debug!(workspace = %id, "Joining in-flight provisioning run");
                    run.clone()
                }
                None => {
                    let run = self.spawn_run(id.clone());
                    in_flight.insert(id.clone(), run.clone());
                    run
                }
            }
        };

        run.await
    }

    fn spawn_run(&self, id: WorkspaceId) -> InFlight {
        let this = self.clone();
        let task = tokio::spawn(async move {
            let result = this.run(&id).await;
            this.inner.in_flight.lock().await.remove(&id);
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(ProvisionError::Internal(format!(
                    "provisioning task failed: {}",
                    e
                )))
            })
        }
        .boxed()
        .shared()
    }

    async fn run(&self, id: &WorkspaceId) -> Result<ProvisionOutcome> {
        let result = self.execute(id).await;

        match &result {
            Ok(outcome) => {
                info!(workspace = %id, outcome = ?outcome, "Workspace ready");
                self.inner.hub.publish(id, ProgressPhase::Completed);
            }
            Err(e) => {
                error!(workspace = %id, error = %e, "Provisioning failed");
                self.inner.hub.publish(id, ProgressPhase::Failed(e.to_string()));
            }
        }
        self.inner.hub.release(id);

        result
    }

    async fn execute(&self, id: &WorkspaceId) -> Result<ProvisionOutcome> {
        let inner = &self.inner;
        let path = inner.locator.path_for(id);

        inner.hub.publish(id, ProgressPhase::Preparing);

        match inner.locator.state(id) {
            WorkspaceState::Provisioned => {
                debug!(workspace = %id, "Workspace already provisioned");
                return Ok(ProvisionOutcome::AlreadyExists);
            }
            WorkspaceState::Missing | WorkspaceState::Partial { empty: true } => {}
            WorkspaceState::Partial { empty: false } => match inner.partial_policy {
                PartialPolicy::Reject => {
                    return Err(ProvisionError::PartialWorkspace { path });
                }
                PartialPolicy::Wipe => {
                    warn!(workspace = %id, path = %path.display(), "Removing partial workspace");
                    tokio::fs::remove_dir_all(&path).await.map_err(|e| {
                        ProvisionError::DirectoryCreation {
                            path: path.clone(),
                            reason: format!("could not remove partial workspace: {}", e),
                        }
                    })?;
                }
            },
        }

        inner.hub.publish(id, ProgressPhase::Initializing);
        create_workspace_dir(&path).await?;

        info!(
            workspace = %id,
            source = %inner.source_repo,
            path = %path.display(),
            "Cloning repository"
        );
        inner.hub.publish(id, ProgressPhase::Cloning);
        let cancel = inner.shutdown.child_token();
        inner
            .vcs
            .clone_repo(&inner.source_repo, &path, &cancel)
            .await?;

        inner.hub.publish(id, ProgressPhase::SettingUp);
        if !inner.locator.exists(id) {
            return Err(ProvisionError::Clone(
                "clone finished without version-control metadata".to_string(),
            ));
        }

        Ok(ProvisionOutcome::Created)
    }
}

async fn create_workspace_dir(path: &Path) -> Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);

    builder
        .create(path)
        .await
        .map_err(|e| ProvisionError::DirectoryCreation {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

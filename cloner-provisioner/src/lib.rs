//! Workspace provisioning business logic
//!
//! Locates workspaces on disk, clones the configured source repository into
//! them, and publishes progress phases for streaming to clients. Consumed by
//! the cloner-api HTTP service.

pub mod editor;
pub mod engine;
pub mod error;
pub mod progress;
pub mod vcs;
pub mod workspace;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use editor::{CommandEditor, EditorLauncher};
pub use engine::{PartialPolicy, ProvisionOutcome, Provisioner, ProvisionerBuilder};
pub use error::{EditorError, ProvisionError, Result};
pub use progress::{
    live_milestones, scripted_milestones, ProgressHub, ProgressPhase, COMPLETION_SENTINEL,
    FAILURE_SENTINEL,
};
pub use vcs::{GitCli, VersionControl};
pub use workspace::{WorkspaceId, WorkspaceLocator, WorkspaceState, METADATA_DIR};

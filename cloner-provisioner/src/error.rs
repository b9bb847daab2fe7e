use std::path::PathBuf;

use cloner_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Why a provisioning attempt failed.
///
/// Causes are carried as text so one failure can be handed to every caller
/// waiting on the same in-flight run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("could not create {}: {reason}", path.display())]
    DirectoryCreation { path: PathBuf, reason: String },

    #[error("{} exists without version-control metadata and is not empty", path.display())]
    PartialWorkspace { path: PathBuf },

    #[error("{0}")]
    Clone(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Cancelled(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProvisionError {
    /// Map a failure of the external clone command onto the provisioning taxonomy.
    pub fn from_clone(err: CoreError) -> Self {
        match err {
            CoreError::Timeout(msg) => ProvisionError::Timeout(msg),
            CoreError::Cancelled(msg) => ProvisionError::Cancelled(msg),
            other => ProvisionError::Clone(other.to_string()),
        }
    }
}

/// Why launching the editor failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("{0}")]
    Launch(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Cancelled(String),
}

impl From<CoreError> for EditorError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Timeout(msg) => EditorError::Timeout(msg),
            CoreError::Cancelled(msg) => EditorError::Cancelled(msg),
            other => EditorError::Launch(other.to_string()),
        }
    }
}

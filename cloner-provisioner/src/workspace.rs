use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cloner_core::validate_workspace_id;
use tracing::warn;

use crate::error::{ProvisionError, Result};

/// Entry whose presence marks a directory as a version-control working copy.
pub const METADATA_DIR: &str = ".git";

/// A validated workspace identifier.
///
/// Holding one guarantees the value passed the allow-list check, so it is
/// safe to use as a single path segment and as a process argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    pub fn parse(raw: &str) -> Result<Self> {
        validate_workspace_id(raw)
            .map_err(|e| ProvisionError::InvalidIdentifier(e.to_string()))?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WorkspaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What the filesystem says about a workspace directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    /// No directory at the workspace path.
    Missing,
    /// A directory exists but holds no version-control metadata.
    Partial { empty: bool },
    /// A directory with version-control metadata.
    Provisioned,
}

/// Maps identifiers to directories under a workspace root.
///
/// State is recomputed from the filesystem on every call; nothing is cached.
#[derive(Debug, Clone)]
pub struct WorkspaceLocator {
    root: PathBuf,
}

impl WorkspaceLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &WorkspaceId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// True when the workspace directory exists and contains metadata.
    pub fn exists(&self, id: &WorkspaceId) -> bool {
        self.state(id) == WorkspaceState::Provisioned
    }

    pub fn state(&self, id: &WorkspaceId) -> WorkspaceState {
        let path = self.path_for(id);

        match probe(&path) {
            Some(meta) if meta.is_dir() => {}
            _ => return WorkspaceState::Missing,
        }

        if probe(&path.join(METADATA_DIR)).is_some() {
            WorkspaceState::Provisioned
        } else {
            WorkspaceState::Partial {
                empty: is_empty_dir(&path),
            }
        }
    }
}

/// Stat a path. Errors other than not-found are logged and read as absence.
fn probe(path: &Path) -> Option<fs::Metadata> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Treating unreadable path as absent");
            None
        }
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

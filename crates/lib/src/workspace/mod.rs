//! Workspace materialization.
//!
//! A workspace is the directory `<previews root>/<build id>/` holding exactly
//! the files of one build request. It is created fresh for every request and
//! owned by that request's build; nothing else writes into it.
//!
//! # Submodules
//!
//! - [`path`] - Validation of client-supplied relative paths

pub mod path;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::consts::SCAFFOLD_DIRS;
use crate::id::BuildId;

/// Errors that can occur while materializing a workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
  /// A submitted path would land outside the workspace.
  #[error("invalid path {path:?}: {reason}")]
  InvalidPath { path: String, reason: &'static str },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  /// Writing one of the submitted files failed.
  #[error("failed to write {path}: {source}")]
  Write { path: String, source: std::io::Error },

  #[error("failed to serialize {path}: {source}")]
  Serialize { path: String, source: serde_json::Error },

  #[error("write task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

/// Content of one submitted file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileContent {
  /// Written byte-for-byte.
  Text(String),
  /// Any other JSON value, written as pretty-printed JSON.
  Structured(serde_json::Value),
}

impl FileContent {
  /// Render the content as it will appear on disk.
  ///
  /// Structured values use two-space indentation; object keys come out
  /// sorted since `serde_json::Map` is ordered.
  pub fn render(&self) -> Result<String, serde_json::Error> {
    match self {
      FileContent::Text(text) => Ok(text.clone()),
      FileContent::Structured(value) => serde_json::to_string_pretty(value),
    }
  }
}

impl From<serde_json::Value> for FileContent {
  fn from(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::String(text) => FileContent::Text(text),
      other => FileContent::Structured(other),
    }
  }
}

/// Path of the workspace for `id` under `root`.
pub fn workspace_dir(root: &Path, id: &BuildId) -> PathBuf {
  root.join(id.as_str())
}

/// Materialize `files` into a fresh workspace under `root`.
///
/// All paths are validated before anything touches the disk, so a rejected
/// request leaves no directory behind. Files are then written concurrently;
/// the first failure aborts the remaining writes.
///
/// # Returns
///
/// The workspace directory (`<root>/<id>`).
pub async fn materialize(
  root: &Path,
  id: &BuildId,
  files: &BTreeMap<String, FileContent>,
) -> Result<PathBuf, WorkspaceError> {
  let entries = validate_paths(files)?;
  let workspace = workspace_dir(root, id);

  info!(id = %id, files = entries.len(), path = %workspace.display(), "materializing workspace");

  for dir in SCAFFOLD_DIRS {
    let path = workspace.join(dir);
    fs::create_dir_all(&path)
      .await
      .map_err(|source| WorkspaceError::CreateDir { path, source })?;
  }

  let mut join_set = JoinSet::new();

  for (key, relative, content) in entries {
    let target = workspace.join(relative);
    let content = content.render().map_err(|source| WorkspaceError::Serialize {
      path: key.clone(),
      source,
    })?;

    join_set.spawn(async move {
      write_file(&target, content.as_bytes())
        .await
        .map_err(|source| WorkspaceError::Write { path: key, source })
    });
  }

  while let Some(joined) = join_set.join_next().await {
    if let Err(e) = joined? {
      error!(id = %id, error = %e, "workspace write failed");
      // Dropping the set aborts writes still in flight.
      return Err(e);
    }
  }

  debug!(id = %id, "workspace ready");
  Ok(workspace)
}

/// Validate every key, rejecting traversal and keys that collide once normalized.
fn validate_paths(files: &BTreeMap<String, FileContent>) -> Result<Vec<(String, PathBuf, &FileContent)>, WorkspaceError> {
  let mut seen = HashSet::new();
  let mut entries = Vec::with_capacity(files.len());

  for (key, content) in files {
    let relative = path::relative_path(key).map_err(|reason| WorkspaceError::InvalidPath {
      path: key.clone(),
      reason,
    })?;

    if !seen.insert(relative.clone()) {
      return Err(WorkspaceError::InvalidPath {
        path: key.clone(),
        reason: "duplicates another path",
      });
    }

    entries.push((key.clone(), relative, content));
  }

  Ok(entries)
}

async fn write_file(target: &Path, content: &[u8]) -> std::io::Result<()> {
  if let Some(parent) = target.parent() {
    fs::create_dir_all(parent).await?;
  }
  fs::write(target, content).await
}

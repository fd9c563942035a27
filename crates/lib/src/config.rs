//! Service configuration.
//!
//! A `ServiceConfig` is built once at startup and shared by every request
//! handler. It holds the previews root plus the optional admission and
//! timeout limits.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::info;

use crate::paths::previews_root;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to create previews root {}: {source}", path.display())]
  CreateRoot { path: PathBuf, source: std::io::Error },

  #[error("failed to canonicalize previews root {}: {source}", path.display())]
  Canonicalize { path: PathBuf, source: std::io::Error },

  #[error("max concurrent builds must be at least 1")]
  ZeroConcurrency,

  #[error("max concurrent builds must be at most {max}, got {requested}")]
  TooManyConcurrent { requested: usize, max: usize },
}

/// Configuration for the preview service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
  /// Directory holding one workspace per build id.
  pub previews_root: PathBuf,

  /// Maximum number of builds running their toolchain at once.
  /// If None, builds are not limited.
  pub max_concurrent_builds: Option<usize>,

  /// Deadline for each toolchain step. If None, steps may run forever.
  pub step_timeout: Option<Duration>,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      previews_root: previews_root(),
      max_concurrent_builds: None,
      step_timeout: None,
    }
  }
}

impl ServiceConfig {
  pub fn new(previews_root: impl Into<PathBuf>) -> Self {
    Self {
      previews_root: previews_root.into(),
      ..Self::default()
    }
  }

  /// Create the previews root and resolve it to an absolute path.
  ///
  /// Called once at startup, before the listener accepts requests.
  pub async fn prepare(mut self) -> Result<Self, ConfigError> {
    match self.max_concurrent_builds {
      Some(0) => return Err(ConfigError::ZeroConcurrency),
      Some(requested) if requested > Semaphore::MAX_PERMITS => {
        return Err(ConfigError::TooManyConcurrent {
          requested,
          max: Semaphore::MAX_PERMITS,
        });
      }
      _ => {}
    }

    let path = self.previews_root;
    tokio::fs::create_dir_all(&path)
      .await
      .map_err(|source| ConfigError::CreateRoot {
        path: path.clone(),
        source,
      })?;

    self.previews_root = dunce::canonicalize(&path).map_err(|source| ConfigError::Canonicalize { path, source })?;

    info!(root = %self.previews_root.display(), "previews root ready");
    Ok(self)
  }
}

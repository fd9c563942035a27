//! The build preview pipeline.
//!
//! `PreviewService` ties the pieces together for one request:
//!
//! 1. Validate the payload into a [`BuildRequest`]
//! 2. Generate a fresh [`BuildId`]
//! 3. Materialize the files into `<root>/<id>/`
//! 4. Run the toolchain there (waiting for a permit when builds are limited)
//! 5. Compose the preview URL
//!
//! Every error is local to its request. A failed build leaves its workspace
//! on disk but never yields a URL.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::artifact;
use crate::build::{self, Toolchain};
use crate::config::ServiceConfig;
use crate::id::BuildId;
use crate::process::ProcessError;
use crate::request::{BuildRequest, RequestError};
use crate::workspace::{self, WorkspaceError};

/// `error` field of a response to a malformed payload.
pub const INVALID_PAYLOAD: &str = "Payload inválido: \"files\" ausente ou malformado.";

/// `error` field of a response to a failed build.
pub const BUILD_FAILED: &str = "Erro no build";

/// Errors that can end a build request.
#[derive(Debug, Error)]
pub enum PreviewError {
  #[error("invalid payload: {0}")]
  InvalidPayload(#[from] RequestError),

  #[error(transparent)]
  Workspace(#[from] WorkspaceError),

  #[error(transparent)]
  Process(#[from] ProcessError),
}

impl PreviewError {
  /// True when the request itself was at fault rather than the build.
  pub fn is_client_error(&self) -> bool {
    matches!(
      self,
      PreviewError::InvalidPayload(_) | PreviewError::Workspace(WorkspaceError::InvalidPath { .. })
    )
  }

  /// Diagnostic text for the client: the failing step's stderr when a
  /// toolchain step exited unsuccessfully, the error message otherwise.
  pub fn log(&self) -> String {
    match self {
      PreviewError::Process(ProcessError::Failed { stderr, .. }) => stderr.clone(),
      other => other.to_string(),
    }
  }
}

/// Response body of `POST /build`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BuildOutcome {
  Success { url: String },
  Failure { error: String, log: String },
}

impl From<&PreviewError> for BuildOutcome {
  fn from(err: &PreviewError) -> Self {
    let category = match err {
      PreviewError::InvalidPayload(_) => INVALID_PAYLOAD,
      _ => BUILD_FAILED,
    };
    BuildOutcome::Failure {
      error: category.to_string(),
      log: err.log(),
    }
  }
}

/// A successfully built preview.
#[derive(Debug, Clone)]
pub struct Preview {
  pub id: BuildId,
  pub workspace: PathBuf,
  pub url: String,
}

impl From<&Preview> for BuildOutcome {
  fn from(preview: &Preview) -> Self {
    BuildOutcome::Success {
      url: preview.url.clone(),
    }
  }
}

/// Runs build requests against a shared previews root.
#[derive(Debug)]
pub struct PreviewService {
  config: ServiceConfig,
  toolchain: Toolchain,
  permits: Option<Semaphore>,
}

impl PreviewService {
  pub fn new(config: ServiceConfig, toolchain: Toolchain) -> Self {
    let permits = config.max_concurrent_builds.map(Semaphore::new);
    Self {
      config,
      toolchain,
      permits,
    }
  }

  pub fn config(&self) -> &ServiceConfig {
    &self.config
  }

  /// Parse a raw request body and build it.
  ///
  /// A malformed body fails before an id is generated or anything is written.
  pub async fn submit_body(&self, body: &[u8], host: &str) -> Result<Preview, PreviewError> {
    let request = BuildRequest::from_slice(body).inspect_err(|e| warn!(error = %e, "rejected build payload"))?;
    self.submit(&request, host).await
  }

  /// Build `request` in a fresh workspace and return its preview URL.
  pub async fn submit(&self, request: &BuildRequest, host: &str) -> Result<Preview, PreviewError> {
    let id = BuildId::generate();
    info!(id = %id, files = request.files.len(), "build request received");

    let workspace = workspace::materialize(&self.config.previews_root, &id, &request.files)
      .await
      .inspect_err(|e| warn!(id = %id, error = %e, "workspace rejected"))?;

    let _permit = match &self.permits {
      Some(permits) => {
        debug!(id = %id, available = permits.available_permits(), "waiting for build permit");
        permits.acquire().await.ok()
      }
      None => None,
    };

    if let Err(e) = build::build(&workspace, &self.toolchain, self.config.step_timeout).await {
      error!(id = %id, error = %e, "build failed");
      return Err(e.into());
    }

    let url = artifact::locate(&id, host);
    info!(
      id = %id,
      url = %url,
      output = %artifact::artifact_dir(&self.config.previews_root, &id).display(),
      "preview ready"
    );

    Ok(Preview { id, workspace, url })
  }
}

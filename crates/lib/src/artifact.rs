//! Artifact location.
//!
//! Maps a build id to where its output lives, on disk and under the preview
//! mount. Neither function checks that the toolchain actually produced the
//! output directory.

use std::path::{Path, PathBuf};

use crate::consts::{OUTPUT_DIR, PREVIEW_MOUNT};
use crate::id::BuildId;

/// Public URL of a build's output, e.g. `https://host/preview/<id>/dist/`.
pub fn locate(id: &BuildId, host: &str) -> String {
  format!("https://{host}/{PREVIEW_MOUNT}/{id}/{OUTPUT_DIR}/")
}

/// Directory the toolchain writes its output to for build `id`.
pub fn artifact_dir(root: &Path, id: &BuildId) -> PathBuf {
  root.join(id.as_str()).join(OUTPUT_DIR)
}

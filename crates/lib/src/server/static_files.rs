//! Static serving of built previews.
//!
//! URL paths under the preview mount map onto the previews root. Only paths
//! whose first segment is a build id are served, and a path must still
//! resolve inside the root after symlinks are followed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::id::BuildId;
use crate::service::PreviewService;
use crate::workspace::path::relative_path;

const INDEX_FILE: &str = "index.html";

pub async fn serve_preview(
  State(service): State<Arc<PreviewService>>,
  UrlPath(path): UrlPath<String>,
  uri: Uri,
) -> Response {
  let root = &service.config().previews_root;

  let Some(target) = resolve(root, &path) else {
    debug!(path = %path, "rejected preview path");
    return StatusCode::NOT_FOUND.into_response();
  };

  let Ok(metadata) = fs::metadata(&target).await else {
    return StatusCode::NOT_FOUND.into_response();
  };

  let target = if metadata.is_dir() {
    if !uri.path().ends_with('/') {
      return redirect_to_directory(uri.path());
    }
    target.join(INDEX_FILE)
  } else {
    target
  };

  match contained(root, &target).await {
    Some(file) => send_file(&file).await,
    None => StatusCode::NOT_FOUND.into_response(),
  }
}

/// Map a decoded URL path to a location under `root`.
fn resolve(root: &Path, path: &str) -> Option<PathBuf> {
  let relative = relative_path(path).ok()?;
  let first = relative.components().next()?.as_os_str().to_str()?;
  BuildId::parse(first)?;
  Some(root.join(relative))
}

/// Canonicalize `target`, returning it only if it is a file inside `root`.
///
/// `root` must already be canonical; `ServiceConfig::prepare` guarantees it.
async fn contained(root: &Path, target: &Path) -> Option<PathBuf> {
  let owned = target.to_path_buf();
  let resolved = tokio::task::spawn_blocking(move || dunce::canonicalize(owned))
    .await
    .ok()?
    .ok()?;
  if !resolved.starts_with(root) {
    warn!(path = %target.display(), "preview path resolves outside the previews root");
    return None;
  }
  fs::metadata(&resolved).await.ok()?.is_file().then_some(resolved)
}

fn redirect_to_directory(path: &str) -> Response {
  let location = format!("{path}/");
  match HeaderValue::from_str(&location) {
    Ok(location) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response(),
    Err(_) => StatusCode::NOT_FOUND.into_response(),
  }
}

async fn send_file(path: &Path) -> Response {
  let file = match fs::File::open(path).await {
    Ok(file) => file,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "failed to open preview file");
      return StatusCode::NOT_FOUND.into_response();
    }
  };

  let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
  let headers = response.headers_mut();
  headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type(path)));
  if let Ok(metadata) = fs::metadata(path).await {
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
  }
  response
}

/// Content type for a file, chosen by extension.
pub fn content_type(path: &Path) -> &'static str {
  let extension = path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase)
    .unwrap_or_default();

  match extension.as_str() {
    "html" | "htm" => "text/html; charset=utf-8",
    "js" | "mjs" | "cjs" => "text/javascript; charset=utf-8",
    "css" => "text/css; charset=utf-8",
    "json" | "map" => "application/json",
    "txt" => "text/plain; charset=utf-8",
    "svg" => "image/svg+xml",
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "avif" => "image/avif",
    "ico" => "image/x-icon",
    "wasm" => "application/wasm",
    "woff" => "font/woff",
    "woff2" => "font/woff2",
    "ttf" => "font/ttf",
    "otf" => "font/otf",
    "webmanifest" => "application/manifest+json",
    _ => "application/octet-stream",
  }
}

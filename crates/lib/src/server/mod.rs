//! HTTP boundary.
//!
//! Exposes the preview pipeline over axum:
//! - `GET /` - liveness banner
//! - `POST /build` - submit a file bundle, answered with a [`BuildOutcome`]
//! - `GET /preview/*path` - built output, served from the previews root
//!
//! # Submodules
//!
//! - [`cors`] - Permissive CORS layer
//! - [`static_files`] - Static serving of the previews root

pub mod cors;
pub mod static_files;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::info;

use crate::consts::{BODY_LIMIT_BYTES, PREVIEW_MOUNT};
use crate::service::{BuildOutcome, PreviewService};

/// Host used in preview URLs when a request carries no `Host` header.
const FALLBACK_HOST: &str = "localhost";

/// Body of `GET /`.
pub const BANNER: &str = "Servidor de preview (React/Vite) rodando!";

/// Build the application router around a shared service.
pub fn router(service: Arc<PreviewService>) -> Router {
  Router::new()
    .route("/", get(index))
    .route("/build", post(submit_build))
    .route(&format!("/{PREVIEW_MOUNT}/*path"), get(static_files::serve_preview))
    .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
    .layer(axum::middleware::from_fn(cors::cors))
    .with_state(service)
}

/// Serve the application on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, service: Arc<PreviewService>, shutdown: F) -> std::io::Result<()>
where
  F: Future<Output = ()> + Send + 'static,
{
  info!(addr = ?listener.local_addr().ok(), root = %service.config().previews_root.display(), "listening");
  axum::serve(listener, router(service))
    .with_graceful_shutdown(shutdown)
    .await
}

async fn index() -> &'static str {
  BANNER
}

async fn submit_build(State(service): State<Arc<PreviewService>>, headers: HeaderMap, body: Bytes) -> Response {
  let host = headers
    .get(header::HOST)
    .and_then(|value| value.to_str().ok())
    .unwrap_or(FALLBACK_HOST);

  match service.submit_body(&body, host).await {
    Ok(preview) => (StatusCode::OK, Json(BuildOutcome::from(&preview))).into_response(),
    Err(e) => {
      let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
      } else {
        StatusCode::INTERNAL_SERVER_ERROR
      };
      (status, Json(BuildOutcome::from(&e))).into_response()
    }
  }
}

//! Permissive CORS: any origin may call the service.

use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// Answer preflight requests directly and tag every other response with
/// `Access-Control-Allow-Origin: *`.
pub async fn cors(request: Request, next: Next) -> Response {
  if request.method() == Method::OPTIONS {
    let requested_headers = request.headers().get(header::ACCESS_CONTROL_REQUEST_HEADERS).cloned();

    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
    headers.insert(header::VARY, HeaderValue::from_static("Access-Control-Request-Headers"));
    if let Some(requested) = requested_headers {
      headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested);
    }
    return response;
  }

  let mut response = next.run(request).await;
  response
    .headers_mut()
    .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
  response
}

//! End-to-end tests for the HTTP boundary.

use buildpreview_lib::build::Toolchain;
use buildpreview_lib::server::BANNER;
use buildpreview_lib::service::{BUILD_FAILED, INVALID_PAYLOAD};
use reqwest::StatusCode;
use serde_json::{Value, json};

use super::common::*;

// =============================================================================
// Banner & CORS
// =============================================================================

#[tokio::test]
async fn index_serves_banner() {
  let server = TestServer::start(Toolchain::pnpm()).await;

  let response = server.client.get(server.url("/")).send().await.unwrap();

  assert_eq!(response.status(), StatusCode::OK);
  assert_eq!(response.headers()["access-control-allow-origin"], "*");
  assert_eq!(response.text().await.unwrap(), BANNER);
}

#[tokio::test]
async fn preflight_is_answered() {
  let server = TestServer::start(Toolchain::pnpm()).await;

  let response = server
    .client
    .request(reqwest::Method::OPTIONS, server.url("/build"))
    .header("origin", "https://editor.example.com")
    .header("access-control-request-method", "POST")
    .header("access-control-request-headers", "content-type")
    .send()
    .await
    .unwrap();

  assert_eq!(response.status(), StatusCode::NO_CONTENT);
  assert_eq!(response.headers()["access-control-allow-origin"], "*");
  assert!(
    response.headers()["access-control-allow-methods"]
      .to_str()
      .unwrap()
      .contains("POST")
  );
  assert_eq!(response.headers()["access-control-allow-headers"], "content-type");
}

// =============================================================================
// Payload validation
// =============================================================================

#[tokio::test]
async fn missing_files_is_rejected_without_side_effects() {
  let server = TestServer::start(Toolchain::pnpm()).await;

  let response = server.post_build("{}").await;

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  let body: Value = response.json().await.unwrap();
  assert_eq!(body["error"], INVALID_PAYLOAD);
  assert!(server.workspaces().is_empty());
}

#[tokio::test]
async fn files_array_is_rejected() {
  let server = TestServer::start(Toolchain::pnpm()).await;

  let response = server.post_build(json!({"files": ["a.js"]}).to_string()).await;

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  assert!(server.workspaces().is_empty());
}

#[tokio::test]
async fn non_json_body_is_rejected() {
  let server = TestServer::start(Toolchain::pnpm()).await;

  let response = server.post_build("files=a.js").await;

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  let body: Value = response.json().await.unwrap();
  assert_eq!(body["error"], INVALID_PAYLOAD);
}

#[tokio::test]
async fn traversal_path_is_rejected() {
  let server = TestServer::start(Toolchain::pnpm()).await;

  let response = server
    .post_build(json!({"files": {"../escape.txt": "x"}}).to_string())
    .await;

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  let body: Value = response.json().await.unwrap();
  assert_eq!(body["error"], BUILD_FAILED);
  assert!(body["log"].as_str().unwrap().contains("../escape.txt"));
  assert!(server.workspaces().is_empty());
  assert!(!server.root.parent().unwrap().join("escape.txt").exists());
}

// =============================================================================
// Builds
// =============================================================================

#[cfg(unix)]
mod builds {
  use super::*;

  fn example_payload() -> String {
    json!({
      "files": {
        "package.json": "{\"name\":\"x\"}",
        "src/main.js": "console.log(1)"
      }
    })
    .to_string()
  }

  #[tokio::test]
  async fn successful_build_returns_servable_url() {
    let server = TestServer::start(succeeding_toolchain()).await;

    let response = server.post_build(example_payload()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let body: Value = response.json().await.unwrap();
    let url = body["url"].as_str().unwrap();

    let workspaces = server.workspaces();
    assert_eq!(workspaces.len(), 1);
    let id = workspaces[0].file_name().unwrap().to_str().unwrap();
    let host = server.base_url.trim_start_matches("http://");
    assert_eq!(url, format!("https://{host}/preview/{id}/dist/"));

    let page = server
      .client
      .get(server.url(&format!("/preview/{id}/dist/")))
      .send()
      .await
      .unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    assert_eq!(page.headers()["content-type"], "text/html; charset=utf-8");
    assert_eq!(page.text().await.unwrap(), "<h1>ok</h1>\n");

    let script = server
      .client
      .get(server.url(&format!("/preview/{id}/dist/assets/app.js")))
      .send()
      .await
      .unwrap();
    assert_eq!(script.headers()["content-type"], "text/javascript; charset=utf-8");
    assert_eq!(script.text().await.unwrap(), "console.log(1)\n");
  }

  #[tokio::test]
  async fn submitted_files_are_materialized() {
    let server = TestServer::start(succeeding_toolchain()).await;

    server
      .post_build(
        json!({"files": {"package.json": {"name": "x", "private": true}, "src/main.js": "console.log(1)"}})
          .to_string(),
      )
      .await;

    let workspace = &server.workspaces()[0];
    assert_eq!(
      std::fs::read_to_string(workspace.join("src/main.js")).unwrap(),
      "console.log(1)"
    );
    assert_eq!(
      std::fs::read_to_string(workspace.join("package.json")).unwrap(),
      "{\n  \"name\": \"x\",\n  \"private\": true\n}"
    );
    assert!(workspace.join("public").is_dir());
  }

  #[tokio::test]
  async fn failed_build_returns_stderr_log() {
    let server = TestServer::start(failing_install_toolchain("ERR_PNPM_OUTDATED_LOCKFILE")).await;

    let response = server.post_build(example_payload()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": BUILD_FAILED, "log": "ERR_PNPM_OUTDATED_LOCKFILE\n"}));

    let workspaces = server.workspaces();
    assert_eq!(read_steps(&workspaces[0]), vec!["enable"]);
  }

  #[tokio::test]
  async fn concurrent_requests_get_separate_workspaces() {
    let server = TestServer::start(succeeding_toolchain()).await;

    let (a, b) = tokio::join!(server.post_build(example_payload()), server.post_build(example_payload()));
    let a: Value = a.json().await.unwrap();
    let b: Value = b.json().await.unwrap();

    assert_ne!(a["url"], b["url"]);
    let workspaces = server.workspaces();
    assert_eq!(workspaces.len(), 2);
    for workspace in workspaces {
      assert_eq!(read_steps(&workspace), vec!["enable", "install"]);
      assert!(workspace.join("dist/index.html").exists());
    }
  }

  #[tokio::test]
  async fn directory_without_slash_redirects() {
    let server = TestServer::start(succeeding_toolchain()).await;
    server.post_build(example_payload()).await;
    let id = server.workspaces()[0].file_name().unwrap().to_str().unwrap().to_string();

    let response = server
      .client
      .get(server.url(&format!("/preview/{id}/dist")))
      .send()
      .await
      .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()["location"], format!("/preview/{id}/dist/"));
  }

  #[tokio::test]
  async fn encoded_traversal_is_not_served() {
    let server = TestServer::start(succeeding_toolchain()).await;
    server.post_build(example_payload()).await;
    let id = server.workspaces()[0].file_name().unwrap().to_str().unwrap().to_string();

    let response = server
      .client
      .get(server.url(&format!("/preview/{id}/..%2F..%2F..%2Fetc%2Fpasswd")))
      .send()
      .await
      .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
  }
}

// =============================================================================
// Static serving
// =============================================================================

#[tokio::test]
async fn unknown_preview_is_not_found() {
  let server = TestServer::start(Toolchain::pnpm()).await;

  let response = server
    .client
    .get(server.url("/preview/V1StGXR8_Z5jdHi6B-myT/dist/"))
    .send()
    .await
    .unwrap();

  assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_id_prefix_is_not_found() {
  let server = TestServer::start(Toolchain::pnpm()).await;
  std::fs::write(server.root.join("secret.txt"), "hidden").unwrap();

  let response = server.client.get(server.url("/preview/secret.txt")).send().await.unwrap();

  assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

//! Shared helpers for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use buildpreview_lib::build::{BuildStep, Toolchain};
use buildpreview_lib::config::ServiceConfig;
use buildpreview_lib::server;
use buildpreview_lib::service::PreviewService;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A server bound to a loopback port, stopped when dropped.
pub struct TestServer {
  pub base_url: String,
  pub root: PathBuf,
  pub client: reqwest::Client,
  shutdown: Option<oneshot::Sender<()>>,
  _temp: TempDir,
}

impl TestServer {
  pub async fn start(toolchain: Toolchain) -> Self {
    let temp = TempDir::new().unwrap();
    let config = ServiceConfig::new(temp.path().join("previews"))
      .prepare()
      .await
      .unwrap();
    let root = config.previews_root.clone();
    let service = Arc::new(PreviewService::new(config, toolchain));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server::serve(listener, service, async move {
      let _ = rx.await;
    }));

    let client = reqwest::Client::builder()
      .redirect(reqwest::redirect::Policy::none())
      .build()
      .unwrap();

    Self {
      base_url: format!("http://{addr}"),
      root,
      client,
      shutdown: Some(tx),
      _temp: temp,
    }
  }

  pub fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  pub async fn post_build(&self, body: impl Into<reqwest::Body>) -> reqwest::Response {
    self
      .client
      .post(self.url("/build"))
      .header("content-type", "application/json")
      .body(body)
      .send()
      .await
      .unwrap()
  }

  /// Directories currently under the previews root.
  pub fn workspaces(&self) -> Vec<PathBuf> {
    std::fs::read_dir(&self.root)
      .unwrap()
      .map(|entry| entry.unwrap().path())
      .collect()
  }
}

impl Drop for TestServer {
  fn drop(&mut self) {
    if let Some(tx) = self.shutdown.take() {
      let _ = tx.send(());
    }
  }
}

/// A build step running `script` through `/bin/sh`.
pub fn script_step(script: &str) -> BuildStep {
  BuildStep::new("/bin/sh", ["-c", script])
}

/// Toolchain that succeeds and writes `dist/index.html`.
pub fn succeeding_toolchain() -> Toolchain {
  Toolchain::new(vec![
    script_step("echo enable >> steps.log"),
    script_step("echo install >> steps.log"),
    script_step("mkdir -p dist/assets && echo '<h1>ok</h1>' > dist/index.html && echo 'console.log(1)' > dist/assets/app.js"),
  ])
}

/// Toolchain whose install step fails with `stderr`.
pub fn failing_install_toolchain(stderr: &str) -> Toolchain {
  Toolchain::new(vec![
    script_step("echo enable >> steps.log"),
    script_step(&format!("echo '{stderr}' >&2; exit 1")),
    script_step("echo build >> steps.log"),
  ])
}

pub fn read_steps(workspace: &Path) -> Vec<String> {
  std::fs::read_to_string(workspace.join("steps.log"))
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}

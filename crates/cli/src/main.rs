mod output;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use buildpreview_lib::build::Toolchain;
use buildpreview_lib::config::ServiceConfig;
use buildpreview_lib::consts::{BODY_LIMIT_BYTES, DEFAULT_PORT, PREVIEW_MOUNT};
use buildpreview_lib::paths;
use buildpreview_lib::server;
use buildpreview_lib::service::PreviewService;

use crate::output::{format_bytes, format_timeout, print_error, print_info, print_stat, print_success};

/// buildpreview - Build submitted projects and serve their output
#[derive(Parser)]
#[command(name = "buildpreview")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Address to listen on
  #[arg(long, env = "BUILDPREVIEW_HOST", default_value = "0.0.0.0")]
  host: IpAddr,

  /// Port to listen on
  #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
  port: u16,

  /// Directory holding build workspaces [default: ./previews]
  #[arg(long, env = "BUILDPREVIEW_ROOT")]
  previews_dir: Option<PathBuf>,

  /// Maximum number of builds running at once (unlimited if omitted)
  #[arg(long)]
  max_builds: Option<usize>,

  /// Deadline for each toolchain step, e.g. "10m" (no deadline if omitted)
  #[arg(long, value_parser = humantime::parse_duration)]
  step_timeout: Option<Duration>,

  /// Enable debug logging
  #[arg(short, long)]
  verbose: bool,
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  init_tracing(cli.verbose);

  let result = tokio::runtime::Runtime::new()
    .context("Failed to create async runtime")
    .and_then(|rt| rt.block_on(run(cli)));

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn run(cli: Cli) -> Result<()> {
  let config = ServiceConfig {
    previews_root: cli.previews_dir.unwrap_or_else(paths::previews_root),
    max_concurrent_builds: cli.max_builds,
    step_timeout: cli.step_timeout,
  };
  let config = config.prepare().await.context("Failed to prepare previews root")?;

  let addr = SocketAddr::new(cli.host, cli.port);
  let listener = TcpListener::bind(addr)
    .await
    .with_context(|| format!("Failed to bind {addr}"))?;
  let local_addr = listener.local_addr().context("Failed to read listener address")?;

  print_success(&format!("Listening on http://{local_addr}"));
  print_stat("Previews root", &config.previews_root.display().to_string());
  print_stat("Preview mount", &format!("/{PREVIEW_MOUNT}/"));
  print_stat("Body limit", &format_bytes(BODY_LIMIT_BYTES as u64));
  print_stat(
    "Max builds",
    &config
      .max_concurrent_builds
      .map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
  );
  print_stat("Step timeout", &format_timeout(config.step_timeout));

  let service = Arc::new(PreviewService::new(config, Toolchain::pnpm()));
  server::serve(listener, service, shutdown_signal())
    .await
    .context("Server failed")?;

  print_info("Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "failed to listen for ctrl-c, running until killed");
    std::future::pending::<()>().await;
  }
  info!("shutdown requested");
}

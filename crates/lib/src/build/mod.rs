//! Build orchestration.
//!
//! A build runs the toolchain's steps against a materialized workspace, one
//! after another. The first failing step ends the build and its error is
//! returned unchanged; there are no retries and no partial success.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::process::{self, ProcessError};

/// One command of a toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
  pub program: String,
  pub args: Vec<String>,
}

impl BuildStep {
  pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self {
      program: program.into(),
      args: args.into_iter().map(Into::into).collect(),
    }
  }
}

impl fmt::Display for BuildStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {arg}")?;
    }
    Ok(())
  }
}

/// The ordered command sequence that turns a workspace into build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
  steps: Vec<BuildStep>,
}

impl Toolchain {
  pub fn new(steps: Vec<BuildStep>) -> Self {
    Self { steps }
  }

  /// The production toolchain: enable corepack, install dependencies with
  /// pnpm, then run the project's `build` script.
  pub fn pnpm() -> Self {
    Self::new(vec![
      BuildStep::new("corepack", ["enable"]),
      BuildStep::new("pnpm", ["install"]),
      BuildStep::new("pnpm", ["run", "build"]),
    ])
  }

  pub fn steps(&self) -> &[BuildStep] {
    &self.steps
  }
}

impl Default for Toolchain {
  fn default() -> Self {
    Self::pnpm()
  }
}

/// Run every step of `toolchain` in `workspace`, strictly in order.
///
/// # Arguments
///
/// * `workspace` - Working directory for every step
/// * `toolchain` - Steps to run
/// * `step_timeout` - Optional deadline applied to each step individually
pub async fn build(workspace: &Path, toolchain: &Toolchain, step_timeout: Option<Duration>) -> Result<(), ProcessError> {
  let total = toolchain.steps.len();

  for (idx, step) in toolchain.steps.iter().enumerate() {
    info!(step = %step, index = idx + 1, total, "running build step");

    match process::run(&step.program, &step.args, workspace, step_timeout).await {
      Ok(output) => {
        debug!(step = %step, stdout_bytes = output.stdout.len(), "build step succeeded");
      }
      Err(e) => {
        error!(step = %step, index = idx + 1, error = %e, "build step failed");
        return Err(e);
      }
    }
  }

  info!(workspace = %workspace.display(), "build complete");
  Ok(())
}

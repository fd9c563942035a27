//! buildpreview-lib: Core types and logic for the build preview service
//!
//! This crate turns a submitted source tree into a served build:
//! - `BuildRequest`: the validated file mapping from a client payload
//! - `BuildId`: the token that namespaces a workspace and its artifacts
//! - `Toolchain`: the fixed command sequence run against a workspace
//! - `PreviewService`: the pipeline tying materialization, build and URL together
//! - `server`: the HTTP boundary exposing the pipeline and the built output

pub mod artifact;
pub mod build;
pub mod config;
pub mod consts;
pub mod id;
pub mod paths;
pub mod process;
pub mod request;
pub mod server;
pub mod service;
pub mod workspace;

#[cfg(test)]
pub mod util;

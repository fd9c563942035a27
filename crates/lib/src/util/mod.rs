//! Shared utilities.
//!
//! Test helpers for exercising the process runner and build pipeline.

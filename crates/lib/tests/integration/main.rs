//! Integration tests for buildpreview-lib.
//!
//! Each test starts a real server on a loopback port and talks to it over HTTP.

mod common;
mod server_tests;

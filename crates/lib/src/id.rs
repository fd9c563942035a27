//! Build identifiers.
//!
//! A `BuildId` namespaces one request's workspace on disk and its artifacts
//! under the preview mount. Ids are random rather than content-addressed:
//! identical submissions still get independent workspaces.

use rand::Rng;

use crate::consts::BUILD_ID_LEN;

/// URL- and filesystem-safe alphabet (64 symbols, so every character carries 6 bits).
const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// An opaque, unique token identifying a single build request.
///
/// # Format
///
/// 21 characters drawn from `A-Z a-z 0-9 _ -`, e.g. `"V1StGXR8_Z5jdHi6B-myT"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildId(String);

impl BuildId {
  /// Generate a fresh id from the thread-local CSPRNG.
  pub fn generate() -> Self {
    let mut rng = rand::thread_rng();
    let id = (0..BUILD_ID_LEN)
      .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
      .collect();
    BuildId(id)
  }

  /// Accept a string only if it has the exact shape of a generated id.
  pub fn parse(value: &str) -> Option<Self> {
    let well_formed = value.len() == BUILD_ID_LEN && value.bytes().all(|b| ALPHABET.contains(&b));
    well_formed.then(|| BuildId(value.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for BuildId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

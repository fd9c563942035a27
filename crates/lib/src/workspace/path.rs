//! Validation of client-supplied relative paths.
//!
//! Both workspace keys and preview URLs go through `relative_path`, so a path
//! accepted here can always be joined onto a directory without leaving it.

use std::path::{Component, PathBuf};

/// Normalize a forward-slash separated relative path.
///
/// Empty and `.` segments are dropped. The result contains only normal
/// components, so `root.join(result)` stays strictly inside `root`.
///
/// Returns the reason for rejection on failure.
pub fn relative_path(raw: &str) -> Result<PathBuf, &'static str> {
  if raw.contains('\0') {
    return Err("contains a NUL byte");
  }
  if raw.contains('\\') {
    return Err("contains a backslash");
  }
  if raw.starts_with('/') {
    return Err("is absolute");
  }

  let mut normalized = PathBuf::new();
  for segment in raw.split('/') {
    match segment {
      "" | "." => continue,
      ".." => return Err("contains a parent directory segment"),
      _ => normalized.push(segment),
    }
  }

  if normalized.as_os_str().is_empty() {
    return Err("is empty");
  }

  // Catches drive letters and other prefixes on platforms that parse them.
  if !normalized.components().all(|c| matches!(c, Component::Normal(_))) {
    return Err("is not a plain relative path");
  }

  Ok(normalized)
}

use std::path::PathBuf;

/// Environment variable overriding the previews root.
pub const ROOT_ENV: &str = "BUILDPREVIEW_ROOT";

/// Returns the directory under which workspaces are created and served.
///
/// `$BUILDPREVIEW_ROOT` when set and non-empty, otherwise `previews/`
/// relative to the working directory.
pub fn previews_root() -> PathBuf {
  match std::env::var(ROOT_ENV) {
    Ok(path) if !path.is_empty() => PathBuf::from(path),
    _ => default_previews_root(),
  }
}

pub fn default_previews_root() -> PathBuf {
  PathBuf::from("previews")
}

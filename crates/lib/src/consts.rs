/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 3001;

/// URL prefix under which the previews root is served.
pub const PREVIEW_MOUNT: &str = "preview";

/// Directory the toolchain writes its build output to, relative to the workspace.
pub const OUTPUT_DIR: &str = "dist";

/// Directories created in every workspace before files are written.
pub const SCAFFOLD_DIRS: &[&str] = &["src", "public"];

/// Maximum accepted size of a `POST /build` body.
pub const BODY_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Number of characters in a generated build id.
pub const BUILD_ID_LEN: usize = 21;

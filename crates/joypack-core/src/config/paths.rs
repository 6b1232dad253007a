//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_DIR_NAME: &str = "joypack";
pub const CONFIG_FILE_NAME: &str = "joypack.toml";

/// `<config_dir>/joypack/joypack.toml`, falling back to `~/.config`.
pub fn config_path(config_dir: Option<&Path>, home_dir: &Path) -> PathBuf {
    config_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| home_dir.join(".config"))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Expand a leading `~` or `~/` against `home`; other paths pass through.
pub fn expand_home(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    }
}

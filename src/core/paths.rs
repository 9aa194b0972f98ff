use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::taxonomy::rank::DEFAULT_RANKS_FILE;

// Cache the home directory to avoid repeated environment lookups
static TAXKIT_HOME: OnceLock<PathBuf> = OnceLock::new();

/// Get the taxkit home directory
/// Checks TAXKIT_HOME environment variable, falls back to ${HOME}/.taxkit
pub fn taxkit_home() -> PathBuf {
    TAXKIT_HOME
        .get_or_init(|| {
            if let Ok(path) = std::env::var("TAXKIT_HOME") {
                PathBuf::from(path)
            } else {
                let home = std::env::var("HOME").unwrap_or_else(|_| {
                    std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string())
                });
                PathBuf::from(home).join(".taxkit")
            }
        })
        .clone()
}

/// Config file read when no --config is given
pub fn default_config_path() -> PathBuf {
    taxkit_home().join("config.toml")
}

/// Dump directory: explicit choice first, then the home directory
pub fn data_dir(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(taxkit_home)
}

/// Rank order file: explicit choice first, then <data_dir>/ranks.txt
pub fn rank_file(explicit: Option<&Path>, data_dir: &Path) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(DEFAULT_RANKS_FILE))
}

use directories::BaseDirs;
use std::path::{Path, PathBuf};

use crate::store::location::APP_NAME;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// The user's home directory: `$HOME` first, then the platform lookup
    pub fn home_dir() -> Option<PathBuf> {
        match std::env::var_os("HOME") {
            Some(home) if !home.is_empty() => Some(PathBuf::from(home)),
            _ => BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
        }
    }

    /// Per-user root, `<home>/.yadarts`
    pub fn root(home: &Path) -> PathBuf {
        home.join(format!(".{APP_NAME}"))
    }

    pub fn config_path(home: &Path) -> PathBuf {
        Self::root(home).join("config.json")
    }

    pub fn log_path(home: &Path) -> PathBuf {
        Self::root(home).join(format!("{APP_NAME}.log"))
    }
}

use std::path::{Path, PathBuf};

/// Application identifier used for the per-user dot-directory.
pub const APP_NAME: &str = "yadarts";

/// Directory holding the highscore file, in both layouts.
pub const DATA_DIR: &str = "data";

/// File name of the highscore database.
pub const HIGHSCORE_FILE: &str = "highscore.db";

/// Where the highscore file used to live and where it lives now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    legacy_path: PathBuf,
    canonical_path: PathBuf,
    root_dir: PathBuf,
}

impl StoreLocation {
    /// Computes both paths for `home`. No I/O is performed.
    pub fn resolve<P: AsRef<Path>>(home: P) -> Self {
        let relative = Path::new(DATA_DIR).join(HIGHSCORE_FILE);
        let root_dir = home.as_ref().join(format!(".{APP_NAME}"));

        Self {
            legacy_path: Path::new(".").join(&relative),
            canonical_path: root_dir.join(&relative),
            root_dir,
        }
    }

    /// Anchors the legacy path on `dir` instead of the working directory.
    pub fn with_legacy_root<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.legacy_path = dir.as_ref().join(DATA_DIR).join(HIGHSCORE_FILE);
        self
    }

    pub fn legacy_path(&self) -> &Path {
        &self.legacy_path
    }

    pub fn canonical_path(&self) -> &Path {
        &self.canonical_path
    }

    /// Directory the canonical file lives in.
    pub fn canonical_dir(&self) -> &Path {
        self.canonical_path.parent().unwrap_or(&self.root_dir)
    }

    /// Per-user root shared with config and logs, `<home>/.yadarts`.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}
